use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::Result;
use crate::models::BackupFrequency;

#[derive(Debug, Deserialize)]
pub struct TriggerParams {
    /// Defaults to daily
    pub frequency: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub frequency: BackupFrequency,
    pub dispatched: usize,
}

/// Manual backup trigger
///
/// Starts a backup run in the background and answers as soon as the table
/// backups are dispatched. Success here says nothing about the outcome of
/// the run; that only shows up in the logs.
///
/// GET /api/backup/test?frequency=<daily|weekly|monthly>
pub async fn trigger_backup(
    State(state): State<AppState>,
    Query(params): Query<TriggerParams>,
) -> Result<Json<TriggerResponse>> {
    let frequency = match params.frequency.as_deref() {
        Some(raw) => raw.parse()?,
        None => BackupFrequency::Daily,
    };

    let dispatched = state.orchestrator.dispatch(frequency);
    tracing::info!("Manual {} backup dispatched for {} tables", frequency, dispatched);

    Ok(Json(TriggerResponse {
        success: true,
        frequency,
        dispatched,
    }))
}
