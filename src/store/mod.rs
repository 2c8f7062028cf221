//! Table store collaborator
//!
//! The backup engine talks to source and destination stores only through
//! [`TableStore`]. Two implementations ship with the crate: an in-process
//! store and a redb-backed store.

pub mod memory;
pub mod redb_store;

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::constants::MEMORY_STORE_PREFIX;
use crate::error::AppError;
use crate::models::BackupRecord;

pub use self::memory::InMemoryTableStore;
pub use self::redb_store::RedbTableStore;

/// Errors raised by a table store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    TableAlreadyExists(String),

    #[error("Record ({partition_key}, {row_key}) already exists in table {table}")]
    RecordConflict {
        table: String,
        partition_key: String,
        row_key: String,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Transient failures are worth retrying; everything else is final
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::RequestFailed(_))
    }
}

/// Lazy, forward-only sequence of a table's records
pub type RecordStream = BoxStream<'static, Result<BackupRecord, StoreError>>;

/// Shared store handle
pub type SharedStore = Arc<dyn TableStore>;

/// Minimal surface of a key/value table store
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Names of the tables called exactly `name`
    async fn list_tables(&self, name: &str) -> Result<Vec<String>, StoreError>;

    /// Drop a table and all its records; fails if the table does not exist
    async fn delete_table(&self, name: &str) -> Result<(), StoreError>;

    /// Create an empty table; fails if the table already exists
    async fn create_table(&self, name: &str) -> Result<(), StoreError>;

    /// Stream every record of a table in store order
    async fn stream_records(&self, table: &str) -> Result<RecordStream, StoreError>;

    /// Insert a record; fails if its key is already present
    async fn append_record(&self, table: &str, record: BackupRecord) -> Result<(), StoreError>;
}

/// Open the store addressed by a connection string
///
/// `memory://<name>` selects an in-process store, anything else is the path
/// of a redb database file.
pub fn open_store(connection_string: &str) -> Result<SharedStore, StoreError> {
    if let Some(name) = connection_string.strip_prefix(MEMORY_STORE_PREFIX) {
        tracing::info!("Using in-memory table store: {}", name);
        return Ok(Arc::new(InMemoryTableStore::new()));
    }

    Ok(Arc::new(RedbTableStore::open(connection_string)?))
}

/// Open source and destination stores
///
/// Both connection strings must address different stores: a daily backup
/// writes to the logical table name, so a shared store would have every
/// source table deleted and recreated empty before it is copied.
pub fn open_stores(
    source: &str,
    destination: &str,
) -> crate::error::Result<(SharedStore, SharedStore)> {
    if source.trim() == destination.trim() {
        return Err(AppError::Config(
            "Source and backup connection strings must address different stores".to_string(),
        ));
    }

    let source_store = open_store(source)?;
    let destination_store = open_store(destination)?;

    Ok((source_store, destination_store))
}
