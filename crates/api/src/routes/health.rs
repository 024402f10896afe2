//! Health check endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use donation_store::DonationStore;
use serde::Serialize;

use crate::routes::donations::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// `open` while payment updates can flow, `closed` during shutdown.
    pub settlement_queue: &'static str,
}

/// GET /health: reports liveness and settlement queue state.
pub async fn check<S: DonationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Json<HealthResponse> {
    let settlement_queue = if state.service.queue().is_closed().await {
        "closed"
    } else {
        "open"
    };
    Json(HealthResponse {
        status: "ok",
        settlement_queue,
    })
}
