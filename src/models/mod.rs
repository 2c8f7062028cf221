pub mod frequency;
pub mod outcome;
pub mod record;

pub use frequency::BackupFrequency;
pub use outcome::{BackupPhase, TableBackupFailure, TableBackupOutcome, summarize};
pub use record::{BackupRecord, Properties, PropertyValue};
