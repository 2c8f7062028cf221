//! Cron-driven backup triggers, one background task per frequency

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use cron::Schedule;
use tokio::task::JoinHandle;

use crate::backup::BackupOrchestrator;
use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::BackupFrequency;

/// Cron schedule of one backup frequency
#[derive(Debug, Clone)]
pub struct BackupSchedule {
    pub frequency: BackupFrequency,
    pub schedule: Schedule,
}

impl BackupSchedule {
    /// Parse a six-field (seconds first) cron expression
    pub fn parse(frequency: BackupFrequency, expression: &str) -> Result<Self> {
        let schedule = Schedule::from_str(expression).map_err(|e| {
            AppError::Config(format!(
                "Invalid {} backup schedule '{}': {}",
                frequency, expression, e
            ))
        })?;
        Ok(Self {
            frequency,
            schedule,
        })
    }

    /// Schedules of all frequencies from configuration
    pub fn all_from_config(config: &Config) -> Result<Vec<Self>> {
        BackupFrequency::ALL
            .into_iter()
            .map(|frequency| Self::parse(frequency, config.schedule_for(frequency)))
            .collect()
    }

    /// Next fire time strictly after `after`
    pub fn next_after(&self, after: &DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(after).next()
    }
}

/// Spawn one trigger loop per schedule
pub fn spawn_schedules(
    orchestrator: Arc<BackupOrchestrator>,
    schedules: Vec<BackupSchedule>,
) -> Vec<JoinHandle<()>> {
    schedules
        .into_iter()
        .map(|schedule| tokio::spawn(run_schedule(orchestrator.clone(), schedule)))
        .collect()
}

/// Sleep until each fire time, then run the backup to completion
///
/// A run that outlasts the next fire time delays it instead of overlapping.
async fn run_schedule(orchestrator: Arc<BackupOrchestrator>, schedule: BackupSchedule) {
    loop {
        let now = Utc::now();
        let Some(next) = schedule.next_after(&now) else {
            tracing::warn!("No upcoming {} backup, trigger stopped", schedule.frequency);
            return;
        };

        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        tracing::info!("Next {} backup at {}", schedule.frequency, next.to_rfc3339());
        tokio::time::sleep(wait).await;

        orchestrator.run_backup(schedule.frequency).await;
    }
}
