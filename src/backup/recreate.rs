use crate::backup::ResiliencePolicy;
use crate::error::Result;
use crate::store::{StoreError, TableStore};

/// Delete every table called `name`; no match is fine
async fn delete_table_if_exists(
    store: &dyn TableStore,
    name: &str,
) -> std::result::Result<(), StoreError> {
    for table in store.list_tables(name).await? {
        store.delete_table(&table).await?;
    }
    Ok(())
}

/// Replace `name` with a new, empty table
///
/// Deletion and creation go through `policy` separately. If deletion fails
/// for good, creation is never attempted.
pub async fn recreate_table(
    store: &dyn TableStore,
    name: &str,
    policy: &ResiliencePolicy,
) -> Result<()> {
    policy.execute(|| delete_table_if_exists(store, name)).await?;
    policy.execute(|| store.create_table(name)).await?;

    tracing::debug!("Recreated table {}", name);
    Ok(())
}
