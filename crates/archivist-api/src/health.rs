use archivist_types::api::HealthResponse;
use axum::{Json, extract::State};
use chrono::Utc;

use crate::state::AppState;

/// GET /api/health: always 200; reports daemon reachability.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let ipfs = if state.ipfs.is_online().await {
        "connected"
    } else {
        "disconnected"
    };

    Json(HealthResponse {
        status: "ok".into(),
        ipfs: ipfs.into(),
        timestamp: Utc::now(),
    })
}
