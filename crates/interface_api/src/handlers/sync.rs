//! Sync administration handlers
//!
//! The scheduled worker covers steady state; these endpoints exist for
//! monitoring and for triggering a re-sync on demand.

use axum::extract::State;
use axum::Json;

use domain_leads::{ConnectionReport, SyncRunReport};

use crate::error::ApiError;
use crate::AppState;

/// Admin: runs one sync batch immediately
pub async fn run_sync(State(state): State<AppState>) -> Result<Json<SyncRunReport>, ApiError> {
    let report = state.engine.process_pending_syncs().await?;
    Ok(Json(report))
}

/// Admin: probes the CRM endpoints and reports per-endpoint status
pub async fn connection_test(State(state): State<AppState>) -> Json<ConnectionReport> {
    Json(state.crm.test_connection().await)
}
