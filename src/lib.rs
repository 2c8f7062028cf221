//! Table Backup Server Library
//!
//! Scheduled full-refresh copies of key/value tables from a source store to
//! a backup store, on daily, weekly and monthly cadences.

pub mod backup;
pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod routes;
pub mod scheduler;
pub mod store;

pub use backup::{BackupOrchestrator, ResiliencePolicy};
pub use config::Config;
pub use error::{AppError, Result};
pub use models::{BackupFrequency, BackupRecord, TableBackupOutcome};
pub use store::{SharedStore, StoreError, TableStore};

use std::sync::Arc;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<BackupOrchestrator>,
    pub config: Config,
}

impl AppState {
    /// Create a new AppState with the given orchestrator and configuration
    pub fn new(orchestrator: Arc<BackupOrchestrator>, config: Config) -> Self {
        Self {
            orchestrator,
            config,
        }
    }
}
