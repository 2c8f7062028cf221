use std::sync::Arc;

use futures::future::join_all;

use crate::backup::{ResiliencePolicy, copy_entities, recreate_table};
use crate::models::{
    BackupFrequency, BackupPhase, TableBackupFailure, TableBackupOutcome, summarize,
};
use crate::store::SharedStore;

/// Backs up the configured tables from the source to the destination store
///
/// Every table is an independent unit: its failure is logged and reported in
/// its outcome, never propagated to the other tables of the run.
pub struct BackupOrchestrator {
    source: SharedStore,
    destination: SharedStore,
    tables: Arc<[String]>,
    policy: ResiliencePolicy,
}

impl BackupOrchestrator {
    pub fn new(source: SharedStore, destination: SharedStore, tables: Vec<String>) -> Self {
        Self {
            source,
            destination,
            tables: tables.into(),
            policy: ResiliencePolicy::default(),
        }
    }

    /// Replace the retry policy used for table recreation
    pub fn with_policy(mut self, policy: ResiliencePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn tables(&self) -> &[String] {
        &self.tables
    }

    pub fn source(&self) -> &SharedStore {
        &self.source
    }

    pub fn destination(&self) -> &SharedStore {
        &self.destination
    }

    /// Back up every configured table concurrently and wait for all of them
    ///
    /// Outcomes are returned in configuration order.
    pub async fn run_backup(&self, frequency: BackupFrequency) -> Vec<TableBackupOutcome> {
        tracing::info!(
            "Starting {} backup of {} tables",
            frequency,
            self.tables.len()
        );

        let handles: Vec<_> = self
            .tables
            .iter()
            .map(|table| {
                let unit = TableBackup {
                    source: self.source.clone(),
                    destination: self.destination.clone(),
                    table: table.clone(),
                    frequency,
                    policy: self.policy,
                };
                tokio::spawn(unit.run())
            })
            .collect();

        let outcomes: Vec<TableBackupOutcome> = join_all(handles)
            .await
            .into_iter()
            .zip(self.tables.iter())
            .map(|(joined, table)| {
                joined.unwrap_or_else(|e| {
                    tracing::error!(
                        table = %table,
                        frequency = %frequency,
                        "Backup task aborted: {}",
                        e
                    );
                    TableBackupOutcome {
                        table: table.clone(),
                        destination: frequency.destination_table_name(table),
                        frequency,
                        result: Err(TableBackupFailure {
                            phase: BackupPhase::Started,
                            error: e.into(),
                        }),
                    }
                })
            })
            .collect();

        let (succeeded, failed) = summarize(&outcomes);
        tracing::info!(
            "Finished {} backup: {} tables succeeded, {} failed",
            frequency,
            succeeded,
            failed
        );

        outcomes
    }

    /// Start a run in the background and return the number of dispatched tables
    ///
    /// The caller only learns that the run was started, not how it went.
    pub fn dispatch(self: &Arc<Self>, frequency: BackupFrequency) -> usize {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            orchestrator.run_backup(frequency).await;
        });
        self.tables.len()
    }
}

/// One table of a run; owns everything it touches
struct TableBackup {
    source: SharedStore,
    destination: SharedStore,
    table: String,
    frequency: BackupFrequency,
    policy: ResiliencePolicy,
}

impl TableBackup {
    async fn run(self) -> TableBackupOutcome {
        tracing::info!(
            table = %self.table,
            frequency = %self.frequency,
            "Backup of table {} started",
            self.table
        );

        let destination_table = self.frequency.destination_table_name(&self.table);
        let result = self.copy_into(&destination_table).await;

        match &result {
            Ok(records) => tracing::info!(
                table = %self.table,
                frequency = %self.frequency,
                "Backup of table {} completed with {} entries",
                self.table,
                records
            ),
            Err(failure) => tracing::error!(
                table = %self.table,
                frequency = %self.frequency,
                phase = %failure.phase,
                "Backup of table {} failed: {}",
                self.table,
                failure.error
            ),
        }

        TableBackupOutcome {
            table: self.table,
            destination: destination_table,
            frequency: self.frequency,
            result,
        }
    }

    async fn copy_into(&self, destination_table: &str) -> Result<u64, TableBackupFailure> {
        recreate_table(self.destination.as_ref(), destination_table, &self.policy)
            .await
            .map_err(|error| TableBackupFailure {
                phase: BackupPhase::Recreating,
                error,
            })?;

        copy_entities(
            self.source.as_ref(),
            self.destination.as_ref(),
            &self.table,
            destination_table,
        )
        .await
        .map_err(|error| TableBackupFailure {
            phase: BackupPhase::Copying,
            error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BackupRecord;
    use crate::store::InMemoryTableStore;

    #[tokio::test]
    async fn test_outcomes_follow_configuration_order() {
        let source = InMemoryTableStore::new();
        let destination = InMemoryTableStore::new();
        source.seed_table("b", vec![BackupRecord::new("p", "1")]).await;
        source.seed_table("a", vec![]).await;

        let orchestrator = BackupOrchestrator::new(
            Arc::new(source),
            Arc::new(destination),
            vec!["b".to_string(), "a".to_string()],
        )
        .with_policy(ResiliencePolicy::immediate());

        let outcomes = orchestrator.run_backup(BackupFrequency::Daily).await;

        let tables: Vec<&str> = outcomes.iter().map(|o| o.table.as_str()).collect();
        assert_eq!(tables, vec!["b", "a"]);
        assert_eq!(outcomes[0].records(), Some(1));
        assert_eq!(outcomes[1].records(), Some(0));
    }

    #[tokio::test]
    async fn test_no_tables_no_outcomes() {
        let orchestrator = BackupOrchestrator::new(
            Arc::new(InMemoryTableStore::new()),
            Arc::new(InMemoryTableStore::new()),
            vec![],
        );

        assert!(orchestrator.run_backup(BackupFrequency::Monthly).await.is_empty());
    }

    #[tokio::test]
    async fn test_missing_source_fails_while_copying() {
        let destination = InMemoryTableStore::new();
        let orchestrator = BackupOrchestrator::new(
            Arc::new(InMemoryTableStore::new()),
            Arc::new(destination.clone()),
            vec!["location".to_string()],
        )
        .with_policy(ResiliencePolicy::immediate());

        let outcomes = orchestrator.run_backup(BackupFrequency::Weekly).await;

        assert_eq!(outcomes[0].destination, "location_weekly");
        assert_eq!(outcomes[0].failure().unwrap().phase, BackupPhase::Copying);
        // Recreation already happened
        assert_eq!(destination.records("location_weekly").await, Some(vec![]));
    }
}
