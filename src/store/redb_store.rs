use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition, TableHandle};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::{RecordStream, StoreError, TableStore};
use crate::constants::RECORD_STREAM_BUFFER;
use crate::models::{BackupRecord, Properties};

const BINCODE_CONFIG: bincode::config::Configuration = bincode::config::standard();

/// Records keyed by (partition key, row key); values are bincode-encoded properties
type RecordTable<'a> = TableDefinition<'a, (&'static str, &'static str), &'static [u8]>;

fn definition(name: &str) -> RecordTable<'_> {
    TableDefinition::new(name)
}

impl From<redb::DatabaseError> for StoreError {
    fn from(e: redb::DatabaseError) -> Self {
        StoreError::RequestFailed(e.to_string())
    }
}

impl From<redb::TransactionError> for StoreError {
    fn from(e: redb::TransactionError) -> Self {
        StoreError::RequestFailed(e.to_string())
    }
}

impl From<redb::StorageError> for StoreError {
    fn from(e: redb::StorageError) -> Self {
        StoreError::RequestFailed(e.to_string())
    }
}

impl From<redb::CommitError> for StoreError {
    fn from(e: redb::CommitError) -> Self {
        StoreError::RequestFailed(e.to_string())
    }
}

impl From<redb::TableError> for StoreError {
    fn from(e: redb::TableError) -> Self {
        match e {
            redb::TableError::TableDoesNotExist(name) => StoreError::TableNotFound(name),
            redb::TableError::Storage(e) => e.into(),
            other => StoreError::RequestFailed(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        StoreError::RequestFailed(format!("Store task failed: {}", e))
    }
}

/// Table store backed by a redb database file
///
/// redb is synchronous, so every call runs on the blocking thread pool.
#[derive(Clone)]
pub struct RedbTableStore {
    db: Arc<Database>,
}

impl RedbTableStore {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        tracing::info!("Opening table store at: {:?}", path.as_ref());

        // Create parent directory if it doesn't exist
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                tracing::error!("Failed to create store directory: {}", e);
                StoreError::RequestFailed(e.to_string())
            })?;
        }

        let db = Database::create(path)?;
        Ok(Self::from_database(Arc::new(db)))
    }

    /// Wrap an already opened database
    pub fn from_database(db: Arc<Database>) -> Self {
        Self { db }
    }
}

fn table_exists(names: impl Iterator<Item = impl TableHandle>, name: &str) -> bool {
    names.into_iter().any(|t| t.name() == name)
}

fn encode_properties(properties: &Properties) -> Result<Vec<u8>, StoreError> {
    bincode::serde::encode_to_vec(properties, BINCODE_CONFIG)
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

fn decode_properties(bytes: &[u8]) -> Result<Properties, StoreError> {
    bincode::serde::decode_from_slice(bytes, BINCODE_CONFIG)
        .map(|(properties, _)| properties)
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

/// Push every record of `name` into `tx`, stopping early if the receiver is gone
fn scan_table(
    db: &Database,
    name: &str,
    tx: &mpsc::Sender<Result<BackupRecord, StoreError>>,
) -> Result<(), StoreError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(definition(name))?;

    for entry in table.iter()? {
        let (key, value) = entry?;
        let (partition_key, row_key) = key.value();
        let record = BackupRecord {
            partition_key: partition_key.to_string(),
            row_key: row_key.to_string(),
            properties: decode_properties(value.value())?,
        };

        if tx.blocking_send(Ok(record)).is_err() {
            tracing::debug!("Record stream for {} dropped by consumer", name);
            return Ok(());
        }
    }

    Ok(())
}

#[async_trait]
impl TableStore for RedbTableStore {
    async fn list_tables(&self, name: &str) -> Result<Vec<String>, StoreError> {
        let db = self.db.clone();
        let name = name.to_string();

        tokio::task::spawn_blocking(move || -> Result<Vec<String>, StoreError> {
            let read_txn = db.begin_read()?;
            let names = read_txn
                .list_tables()?
                .map(|t| t.name().to_string())
                .filter(|t| *t == name)
                .collect();
            Ok(names)
        })
        .await?
    }

    async fn delete_table(&self, name: &str) -> Result<(), StoreError> {
        let db = self.db.clone();
        let name = name.to_string();

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let write_txn = db.begin_write()?;
            if !write_txn.delete_table(definition(&name))? {
                return Err(StoreError::TableNotFound(name));
            }
            write_txn.commit()?;

            tracing::debug!("Deleted table {}", name);
            Ok(())
        })
        .await?
    }

    async fn create_table(&self, name: &str) -> Result<(), StoreError> {
        let db = self.db.clone();
        let name = name.to_string();

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let write_txn = db.begin_write()?;
            if table_exists(write_txn.list_tables()?, &name) {
                return Err(StoreError::TableAlreadyExists(name));
            }

            // Opening a table inside a write transaction creates it
            drop(write_txn.open_table(definition(&name))?);
            write_txn.commit()?;

            tracing::debug!("Created table {}", name);
            Ok(())
        })
        .await?
    }

    async fn stream_records(&self, table: &str) -> Result<RecordStream, StoreError> {
        // Surface a missing table as an error of the call, not of the stream
        if self.list_tables(table).await?.is_empty() {
            return Err(StoreError::TableNotFound(table.to_string()));
        }

        let db = self.db.clone();
        let name = table.to_string();
        let (tx, rx) = mpsc::channel(RECORD_STREAM_BUFFER);

        tokio::task::spawn_blocking(move || {
            if let Err(e) = scan_table(&db, &name, &tx) {
                tracing::warn!("Reading table {} failed: {}", name, e);
                let _ = tx.blocking_send(Err(e));
            }
        });

        Ok(ReceiverStream::new(rx).boxed())
    }

    async fn append_record(&self, table: &str, record: BackupRecord) -> Result<(), StoreError> {
        let db = self.db.clone();
        let name = table.to_string();

        tokio::task::spawn_blocking(move || -> Result<(), StoreError> {
            let bytes = encode_properties(&record.properties)?;

            let write_txn = db.begin_write()?;
            if !table_exists(write_txn.list_tables()?, &name) {
                return Err(StoreError::TableNotFound(name));
            }
            {
                let mut rows = write_txn.open_table(definition(&name))?;
                let key = (record.partition_key.as_str(), record.row_key.as_str());
                if rows.get(key)?.is_some() {
                    return Err(StoreError::RecordConflict {
                        table: name,
                        partition_key: record.partition_key,
                        row_key: record.row_key,
                    });
                }
                rows.insert(key, bytes.as_slice())?;
            }
            write_txn.commit()?;

            Ok(())
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PropertyValue;
    use tempfile::TempDir;

    fn open_temp_store(temp_dir: &TempDir) -> RedbTableStore {
        RedbTableStore::open(temp_dir.path().join("store.redb")).unwrap()
    }

    async fn collect(store: &RedbTableStore, table: &str) -> Vec<BackupRecord> {
        store
            .stream_records(table)
            .await
            .unwrap()
            .map(|r| r.unwrap())
            .collect()
            .await
    }

    #[tokio::test]
    async fn test_create_list_delete() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_temp_store(&temp_dir);

        store.create_table("signup").await.unwrap();
        assert_eq!(store.list_tables("signup").await.unwrap(), vec!["signup"]);
        assert!(matches!(
            store.create_table("signup").await,
            Err(StoreError::TableAlreadyExists(_))
        ));

        store.delete_table("signup").await.unwrap();
        assert!(store.list_tables("signup").await.unwrap().is_empty());
        assert!(matches!(
            store.delete_table("signup").await,
            Err(StoreError::TableNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_records_keep_keys_and_properties() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_temp_store(&temp_dir);
        store.create_table("location").await.unwrap();

        let record = BackupRecord::new("NL", "amsterdam")
            .with_property("name", "Amsterdam")
            .with_property("population", 921_402i64)
            .with_property("capital", true)
            .with_property("id", PropertyValue::Guid(uuid::Uuid::nil()));
        store.append_record("location", record.clone()).await.unwrap();

        assert_eq!(collect(&store, "location").await, vec![record]);
    }

    #[tokio::test]
    async fn test_append_conflict_and_missing_table() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_temp_store(&temp_dir);

        assert!(matches!(
            store.append_record("user", BackupRecord::new("p", "r")).await,
            Err(StoreError::TableNotFound(_))
        ));
        // A failed append must not have created the table
        assert!(store.list_tables("user").await.unwrap().is_empty());

        store.create_table("user").await.unwrap();
        store.append_record("user", BackupRecord::new("p", "r")).await.unwrap();
        assert!(matches!(
            store.append_record("user", BackupRecord::new("p", "r")).await,
            Err(StoreError::RecordConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_stream_larger_than_buffer() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_temp_store(&temp_dir);
        store.create_table("batch").await.unwrap();

        let total = RECORD_STREAM_BUFFER * 2 + 3;
        for i in 0..total {
            store
                .append_record("batch", BackupRecord::new("p", format!("{:05}", i)))
                .await
                .unwrap();
        }

        assert_eq!(collect(&store, "batch").await.len(), total);
    }

    #[tokio::test]
    async fn test_stream_missing_table_fails() {
        let temp_dir = TempDir::new().unwrap();
        let store = open_temp_store(&temp_dir);

        assert!(matches!(
            store.stream_records("missing").await,
            Err(StoreError::TableNotFound(_))
        ));
    }
}
