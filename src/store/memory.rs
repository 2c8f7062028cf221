use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::RwLock;

use super::{RecordStream, StoreError, TableStore};
use crate::models::BackupRecord;

type Table = BTreeMap<(String, String), BackupRecord>;

/// In-process table store
///
/// Clones share the same tables. Streams iterate over a snapshot taken when
/// the stream is opened.
#[derive(Clone, Default)]
pub struct InMemoryTableStore {
    tables: Arc<RwLock<HashMap<String, Table>>>,
}

impl InMemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (or replace) a table holding `records`
    pub async fn seed_table(&self, name: &str, records: impl IntoIterator<Item = BackupRecord>) {
        let table = records
            .into_iter()
            .map(|r| ((r.partition_key.clone(), r.row_key.clone()), r))
            .collect();
        self.tables.write().await.insert(name.to_string(), table);
    }

    /// Records of a table in key order, `None` if the table does not exist
    pub async fn records(&self, name: &str) -> Option<Vec<BackupRecord>> {
        self.tables
            .read()
            .await
            .get(name)
            .map(|t| t.values().cloned().collect())
    }

    /// All table names, sorted
    pub async fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl TableStore for InMemoryTableStore {
    async fn list_tables(&self, name: &str) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.keys().filter(|t| *t == name).cloned().collect())
    }

    async fn delete_table(&self, name: &str) -> Result<(), StoreError> {
        self.tables
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| StoreError::TableNotFound(name.to_string()))
    }

    async fn create_table(&self, name: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.contains_key(name) {
            return Err(StoreError::TableAlreadyExists(name.to_string()));
        }
        tables.insert(name.to_string(), Table::new());
        Ok(())
    }

    async fn stream_records(&self, table: &str) -> Result<RecordStream, StoreError> {
        let snapshot: Vec<BackupRecord> = self
            .records(table)
            .await
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        Ok(futures::stream::iter(snapshot.into_iter().map(Ok)).boxed())
    }

    async fn append_record(&self, table: &str, record: BackupRecord) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))?;

        let key = (record.partition_key.clone(), record.row_key.clone());
        if rows.contains_key(&key) {
            return Err(StoreError::RecordConflict {
                table: table.to_string(),
                partition_key: key.0,
                row_key: key.1,
            });
        }
        rows.insert(key, record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_existing_table_fails() {
        let store = InMemoryTableStore::new();
        store.create_table("user").await.unwrap();

        assert!(matches!(
            store.create_table("user").await,
            Err(StoreError::TableAlreadyExists(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_missing_table_fails() {
        let store = InMemoryTableStore::new();

        assert!(matches!(
            store.delete_table("user").await,
            Err(StoreError::TableNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_tables_is_exact_match() {
        let store = InMemoryTableStore::new();
        store.create_table("user").await.unwrap();
        store.create_table("user_weekly").await.unwrap();

        assert_eq!(store.list_tables("user").await.unwrap(), vec!["user"]);
        assert!(store.list_tables("use").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_append_duplicate_key_conflicts() {
        let store = InMemoryTableStore::new();
        store.create_table("batch").await.unwrap();
        store
            .append_record("batch", BackupRecord::new("p", "r"))
            .await
            .unwrap();

        let result = store.append_record("batch", BackupRecord::new("p", "r")).await;
        assert!(matches!(result, Err(StoreError::RecordConflict { .. })));
    }

    #[tokio::test]
    async fn test_append_to_missing_table_fails() {
        let store = InMemoryTableStore::new();

        let result = store.append_record("batch", BackupRecord::new("p", "r")).await;
        assert!(matches!(result, Err(StoreError::TableNotFound(_))));
    }

    #[tokio::test]
    async fn test_stream_missing_table_fails() {
        let store = InMemoryTableStore::new();
        assert!(matches!(
            store.stream_records("nope").await,
            Err(StoreError::TableNotFound(_))
        ));
    }
}
