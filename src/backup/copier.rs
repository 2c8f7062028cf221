use futures::StreamExt;

use crate::constants::COPY_PROGRESS_INTERVAL;
use crate::error::Result;
use crate::models::BackupRecord;
use crate::store::TableStore;

/// Copy every record of `source_table` into `destination_table`
///
/// Records are appended one by one without retry; the first failing read or
/// append aborts the copy. Returns the number of copied records.
pub async fn copy_entities(
    source: &dyn TableStore,
    destination: &dyn TableStore,
    source_table: &str,
    destination_table: &str,
) -> Result<u64> {
    let mut records = source.stream_records(source_table).await?;
    let mut count = 0u64;

    while let Some(record) = records.next().await {
        let record = record?;
        let copy = BackupRecord {
            partition_key: record.partition_key,
            row_key: record.row_key,
            properties: record.properties,
        };

        destination.append_record(destination_table, copy).await?;
        count += 1;

        if count % COPY_PROGRESS_INTERVAL == 0 {
            tracing::debug!("Copied {} records from {} so far", count, source_table);
        }
    }

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::PropertyValue;
    use crate::store::{InMemoryTableStore, StoreError};
    use chrono::{TimeZone, Utc};

    fn sample_records() -> Vec<BackupRecord> {
        vec![
            BackupRecord::new("2024-01", "a")
                .with_property("email", "a@example.com")
                .with_property("confirmed", true),
            BackupRecord::new("2024-01", "b")
                .with_property("visits", 12i32)
                .with_property("at", Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
            BackupRecord::new("2024-02", "a")
                .with_property("score", 1.25)
                .with_property("blob", PropertyValue::Binary(vec![9, 8, 7])),
        ]
    }

    #[tokio::test]
    async fn test_copy_is_faithful() {
        let source = InMemoryTableStore::new();
        let destination = InMemoryTableStore::new();
        source.seed_table("signup", sample_records()).await;
        destination.create_table("signup_weekly").await.unwrap();

        let count = copy_entities(&source, &destination, "signup", "signup_weekly")
            .await
            .unwrap();

        assert_eq!(count, 3);
        assert_eq!(destination.records("signup_weekly").await, Some(sample_records()));
    }

    #[tokio::test]
    async fn test_copy_empty_table() {
        let source = InMemoryTableStore::new();
        let destination = InMemoryTableStore::new();
        source.seed_table("batch", vec![]).await;
        destination.create_table("batch").await.unwrap();

        let count = copy_entities(&source, &destination, "batch", "batch")
            .await
            .unwrap();

        assert_eq!(count, 0);
        assert_eq!(destination.records("batch").await, Some(vec![]));
    }

    #[tokio::test]
    async fn test_copy_stops_on_conflict() {
        let source = InMemoryTableStore::new();
        let destination = InMemoryTableStore::new();
        source.seed_table("user", sample_records()).await;
        // Leftover record colliding with the second source record
        destination
            .seed_table("user", vec![BackupRecord::new("2024-01", "b")])
            .await;

        let result = copy_entities(&source, &destination, "user", "user").await;

        assert!(matches!(
            result,
            Err(AppError::Store(StoreError::RecordConflict { .. }))
        ));
        // First record made it before the failure
        assert_eq!(destination.records("user").await.map(|r| r.len()), Some(2));
    }

    #[tokio::test]
    async fn test_copy_missing_source_fails() {
        let source = InMemoryTableStore::new();
        let destination = InMemoryTableStore::new();
        destination.create_table("location").await.unwrap();

        let result = copy_entities(&source, &destination, "location", "location").await;

        assert!(matches!(
            result,
            Err(AppError::Store(StoreError::TableNotFound(_)))
        ));
    }
}
