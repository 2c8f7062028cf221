use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use table_backup_server::{
    AppState, BackupOrchestrator, Config, routes,
    scheduler::{BackupSchedule, spawn_schedules},
    store::open_stores,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "table_backup_server=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Table Backup Server...");

    // Load configuration
    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    tracing::info!(
        "Environment: {}, Server: {}, Tables: {}",
        config.environment,
        config.server_address(),
        config.tables.join(",")
    );

    if config.tables.is_empty() {
        tracing::warn!("No tables configured, scheduled runs will do nothing");
    }

    // Parse schedules before touching any store
    let schedules = BackupSchedule::all_from_config(&config)?;

    let (source, destination) = open_stores(
        &config.source_connection_string,
        &config.backup_connection_string,
    )?;

    let orchestrator = Arc::new(
        BackupOrchestrator::new(source, destination, config.tables.clone())
            .with_policy(config.retry_policy),
    );

    let _triggers = spawn_schedules(orchestrator.clone(), schedules);

    if config.enable_test_trigger {
        tracing::warn!("Manual backup trigger enabled at /api/backup/test");
    }

    let app = routes::router(AppState::new(orchestrator, config.clone()));

    // Start server
    let addr: SocketAddr = config.server_address().parse()?;
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
