use axum::{Json, extract::State};
use serde_json::{Value, json};

use crate::AppState;
use crate::store::SharedStore;

async fn probe(store: &SharedStore, name: &str) -> &'static str {
    match store.list_tables("").await {
        Ok(_) => "connected",
        Err(e) => {
            tracing::error!("{} store health check failed: {:?}", name, e);
            "disconnected"
        }
    }
}

/// Health check endpoint
///
/// Reports whether both the source and the backup store answer.
pub async fn health_check(State(state): State<AppState>) -> Json<Value> {
    let source = probe(state.orchestrator.source(), "Source").await;
    let destination = probe(state.orchestrator.destination(), "Backup").await;
    let healthy = source == "connected" && destination == "connected";

    Json(json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "source": source,
        "destination": destination,
        "tables": state.orchestrator.tables().len(),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
