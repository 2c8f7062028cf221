use std::collections::HashSet;
use std::env;
use std::time::Duration;

use crate::backup::ResiliencePolicy;
use crate::constants::*;
use crate::models::BackupFrequency;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub source_connection_string: String,
    pub backup_connection_string: String,
    pub tables: Vec<String>,
    pub daily_schedule: String,
    pub weekly_schedule: String,
    pub monthly_schedule: String,
    pub retry_policy: ResiliencePolicy,
    pub enable_test_trigger: bool,
    pub environment: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .map_err(|_| "Invalid SERVER_PORT")?;

        let source_connection_string = env::var("SOURCE_CONNECTION_STRING")
            .map_err(|_| "SOURCE_CONNECTION_STRING must be set")?;

        let backup_connection_string = env::var("BACKUP_CONNECTION_STRING")
            .map_err(|_| "BACKUP_CONNECTION_STRING must be set")?;

        let tables = parse_table_list(
            &env::var("BACKUP_TABLES").unwrap_or_else(|_| DEFAULT_BACKUP_TABLES.to_string()),
        );

        let daily_schedule = env::var("DAILY_BACKUP_SCHEDULE")
            .unwrap_or_else(|_| DEFAULT_DAILY_SCHEDULE.to_string());
        let weekly_schedule = env::var("WEEKLY_BACKUP_SCHEDULE")
            .unwrap_or_else(|_| DEFAULT_WEEKLY_SCHEDULE.to_string());
        let monthly_schedule = env::var("MONTHLY_BACKUP_SCHEDULE")
            .unwrap_or_else(|_| DEFAULT_MONTHLY_SCHEDULE.to_string());

        let max_attempts = env::var("BACKUP_RETRY_ATTEMPTS")
            .unwrap_or_else(|_| RETRY_MAX_ATTEMPTS.to_string())
            .parse()
            .map_err(|_| "Invalid BACKUP_RETRY_ATTEMPTS")?;

        let base_delay_secs = env::var("BACKUP_RETRY_BASE_DELAY_SECS")
            .unwrap_or_else(|_| RETRY_BASE_DELAY_SECS.to_string())
            .parse()
            .map_err(|_| "Invalid BACKUP_RETRY_BASE_DELAY_SECS")?;

        let timeout_secs = env::var("BACKUP_TIMEOUT_SECS")
            .unwrap_or_else(|_| OPERATION_TIMEOUT_SECS.to_string())
            .parse()
            .map_err(|_| "Invalid BACKUP_TIMEOUT_SECS")?;

        let retry_policy = ResiliencePolicy {
            max_attempts,
            base_delay: Duration::from_secs(base_delay_secs),
            timeout: Duration::from_secs(timeout_secs),
            ..ResiliencePolicy::default()
        };

        let enable_test_trigger = env::var("ENABLE_TEST_TRIGGER")
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        Ok(Config {
            server_host,
            server_port,
            source_connection_string,
            backup_connection_string,
            tables,
            daily_schedule,
            weekly_schedule,
            monthly_schedule,
            retry_policy,
            enable_test_trigger,
            environment,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// Cron expression configured for a frequency
    pub fn schedule_for(&self, frequency: BackupFrequency) -> &str {
        match frequency {
            BackupFrequency::Daily => &self.daily_schedule,
            BackupFrequency::Weekly => &self.weekly_schedule,
            BackupFrequency::Monthly => &self.monthly_schedule,
        }
    }
}

/// Split a comma-separated table list, dropping blank entries
///
/// Duplicates are kept (each becomes its own backup unit) but logged, since
/// they make two units race on the same destination table.
pub fn parse_table_list(raw: &str) -> Vec<String> {
    let tables: Vec<String> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect();

    let mut seen = HashSet::new();
    for table in &tables {
        if !seen.insert(table.as_str()) {
            tracing::warn!("Table {} is configured more than once", table);
        }
    }

    tables
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table_list() {
        assert_eq!(
            parse_table_list("batch, location ,signup"),
            vec!["batch", "location", "signup"]
        );
    }

    #[test]
    fn test_parse_empty_or_malformed_table_list() {
        assert!(parse_table_list("").is_empty());
        assert!(parse_table_list(" , ,,").is_empty());
        assert_eq!(parse_table_list(",user,"), vec!["user"]);
    }

    #[test]
    fn test_duplicates_are_kept() {
        assert_eq!(parse_table_list("user,user"), vec!["user", "user"]);
    }

    #[test]
    fn test_default_table_list() {
        assert_eq!(
            parse_table_list(DEFAULT_BACKUP_TABLES),
            vec!["batch", "location", "signup", "user", "validlocation"]
        );
    }
}
