use std::fmt;

use crate::error::AppError;
use crate::models::BackupFrequency;

/// Step of a single table backup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupPhase {
    Started,
    Recreating,
    Copying,
}

impl fmt::Display for BackupPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BackupPhase::Started => "started",
            BackupPhase::Recreating => "recreating",
            BackupPhase::Copying => "copying",
        };
        f.write_str(name)
    }
}

/// Why a table backup stopped
#[derive(Debug)]
pub struct TableBackupFailure {
    pub phase: BackupPhase,
    pub error: AppError,
}

impl fmt::Display for TableBackupFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed while {}: {}", self.phase, self.error)
    }
}

/// Result of backing up one configured table
#[derive(Debug)]
pub struct TableBackupOutcome {
    /// Logical (source) table name
    pub table: String,
    /// Table written at the backup store
    pub destination: String,
    pub frequency: BackupFrequency,
    /// Number of copied records, or the failure
    pub result: Result<u64, TableBackupFailure>,
}

impl TableBackupOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn records(&self) -> Option<u64> {
        self.result.as_ref().ok().copied()
    }

    pub fn failure(&self) -> Option<&TableBackupFailure> {
        self.result.as_ref().err()
    }
}

/// Count (succeeded, failed) outcomes of a run
pub fn summarize(outcomes: &[TableBackupOutcome]) -> (usize, usize) {
    let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
    (succeeded, outcomes.len() - succeeded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    fn outcome(table: &str, result: Result<u64, TableBackupFailure>) -> TableBackupOutcome {
        TableBackupOutcome {
            table: table.to_string(),
            destination: table.to_string(),
            frequency: BackupFrequency::Daily,
            result,
        }
    }

    #[test]
    fn test_summarize_counts_failures() {
        let outcomes = vec![
            outcome("a", Ok(3)),
            outcome(
                "b",
                Err(TableBackupFailure {
                    phase: BackupPhase::Copying,
                    error: StoreError::TableNotFound("b".to_string()).into(),
                }),
            ),
            outcome("c", Ok(0)),
        ];

        assert_eq!(summarize(&outcomes), (2, 1));
        assert_eq!(outcomes[0].records(), Some(3));
        assert!(outcomes[1].records().is_none());
        assert_eq!(outcomes[1].failure().unwrap().phase, BackupPhase::Copying);
    }

    #[test]
    fn test_failure_display_names_phase() {
        let failure = TableBackupFailure {
            phase: BackupPhase::Recreating,
            error: AppError::Timeout(std::time::Duration::from_secs(120)),
        };
        assert!(failure.to_string().starts_with("failed while recreating"));
    }
}
