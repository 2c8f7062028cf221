//! Backup engine: retry policy, table recreation, record copy and the
//! per-frequency orchestration of all three

pub mod copier;
pub mod orchestrator;
pub mod recreate;
pub mod resilience;

pub use copier::copy_entities;
pub use orchestrator::BackupOrchestrator;
pub use recreate::recreate_table;
pub use resilience::{Backoff, ResiliencePolicy};
