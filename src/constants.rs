/// Maximum attempts for a retried store operation (first try included)
pub const RETRY_MAX_ATTEMPTS: u32 = 10;

/// Base delay before the first retry; doubled for every following retry
pub const RETRY_BASE_DELAY_SECS: u64 = 5;

/// Upper bound for one retried operation, all attempts and delays included
pub const OPERATION_TIMEOUT_SECS: u64 = 120;

/// Emit a progress trace every N copied records
pub const COPY_PROGRESS_INTERVAL: u64 = 1_000;

/// Records buffered between the redb reader thread and the copier
pub const RECORD_STREAM_BUFFER: usize = 256;

/// Connection string prefix selecting the in-process store
pub const MEMORY_STORE_PREFIX: &str = "memory://";

// =============================================================================
// Configuration Defaults
// =============================================================================

/// Tables backed up when BACKUP_TABLES is not set
pub const DEFAULT_BACKUP_TABLES: &str = "batch,location,signup,user,validlocation";

/// Every day at 01:00 UTC
pub const DEFAULT_DAILY_SCHEDULE: &str = "0 0 1 * * *";

/// Every Sunday at 02:00 UTC
pub const DEFAULT_WEEKLY_SCHEDULE: &str = "0 0 2 * * Sun";

/// First day of every month at 03:00 UTC
pub const DEFAULT_MONTHLY_SCHEDULE: &str = "0 0 3 1 * *";
