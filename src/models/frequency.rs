use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Cadence of a backup run
///
/// Daily backups occupy the destination table with the unmodified logical
/// name; weekly and monthly backups get a suffixed copy next to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupFrequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl BackupFrequency {
    pub const ALL: [BackupFrequency; 3] = [
        BackupFrequency::Daily,
        BackupFrequency::Weekly,
        BackupFrequency::Monthly,
    ];

    /// Lowercase tag used in destination names and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            BackupFrequency::Daily => "daily",
            BackupFrequency::Weekly => "weekly",
            BackupFrequency::Monthly => "monthly",
        }
    }

    /// Name of the backup table receiving `logical_name` at this cadence
    pub fn destination_table_name(&self, logical_name: &str) -> String {
        match self {
            BackupFrequency::Daily => logical_name.to_string(),
            other => format!("{}_{}", logical_name, other.as_str()),
        }
    }
}

impl fmt::Display for BackupFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackupFrequency {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" => Ok(BackupFrequency::Daily),
            "weekly" => Ok(BackupFrequency::Weekly),
            "monthly" => Ok(BackupFrequency::Monthly),
            other => Err(AppError::InvalidInput(format!(
                "Unknown backup frequency: {}",
                other
            ))),
        }
    }
}
