//! HTTP API server with observability for the donation settlement system.
//!
//! Provides REST endpoints for pledging donations and reading confirmed
//! donation aggregates, with structured logging (tracing) and Prometheus
//! metrics. The settlement workers run alongside the server.

pub mod config;
pub mod error;
pub mod profiles;
pub mod routes;
pub mod session;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use donation_service::{
    DonationService, LedgerRecorder, Notifier, Reconciler, ReconcilerHandle, ServiceError,
    TracingLedger, TracingNotifier,
};
use donation_store::DonationStore;
use metrics_exporter_prometheus::PrometheusHandle;
use settlement::{InMemorySettlementQueue, SimulatedPaymentProcessor};
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use profiles::{InMemoryProfileDirectory, ProfileDirectory};
use routes::donations::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: DonationStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check::<S>))
        .route("/donations", post(routes::donations::create::<S>))
        .route("/donations/lookup", post(routes::donations::lookup::<S>))
        .route("/users/{id}/donors", get(routes::donations::donors_of_user::<S>))
        .route("/users/{id}/recipients", get(routes::donations::recipients_of_user::<S>))
        .route("/users/{id}/donations/count", get(routes::donations::count::<S>))
        .route("/posts/{id}/donors", get(routes::donations::donors_of_post::<S>))
        .route("/me/recipients", get(routes::donations::my_recipients::<S>))
        .route("/me/donations/amount", get(routes::donations::my_amount::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state over `store` and `queue`, with an
/// empty in-memory profile directory.
pub fn create_default_state<S: DonationStore + 'static>(
    store: S,
    queue: InMemorySettlementQueue,
) -> Arc<AppState<S>> {
    create_state(store, queue, Arc::new(InMemoryProfileDirectory::new()))
}

/// Creates application state with a custom profile directory.
pub fn create_state<S: DonationStore + 'static>(
    store: S,
    queue: InMemorySettlementQueue,
    profiles: Arc<dyn ProfileDirectory>,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        service: Arc::new(DonationService::new(store, queue)),
        profiles,
    })
}

/// Background tasks driving payment settlement.
pub struct SettlementWorkers {
    pub reconciler: ReconcilerHandle,
    pub processor: JoinHandle<()>,
}

impl SettlementWorkers {
    /// Waits for both workers to drain. Call after closing the queue.
    pub async fn shutdown(self) {
        if let Err(e) = self.processor.await {
            tracing::error!(error = %e, "payment processor task failed");
        }
        if let Err(e) = self.reconciler.join().await {
            tracing::error!(error = %e, "reconciler task failed");
        }
        tracing::info!("settlement workers stopped");
    }
}

/// Starts the reconciler and the simulated payment processor, logging
/// ledger records and notifications.
pub async fn spawn_settlement<S: DonationStore + 'static>(
    state: &AppState<S>,
    checkout_base_url: &str,
) -> Result<SettlementWorkers, ServiceError> {
    spawn_settlement_with(state, checkout_base_url, TracingLedger, TracingNotifier).await
}

/// Starts the settlement workers with the given collaborators.
pub async fn spawn_settlement_with<S, L, N>(
    state: &AppState<S>,
    checkout_base_url: &str,
    ledger: L,
    notifier: N,
) -> Result<SettlementWorkers, ServiceError>
where
    S: DonationStore + 'static,
    L: LedgerRecorder + 'static,
    N: Notifier + 'static,
{
    let queue = state.service.queue().clone();
    let reconciler = Reconciler::spawn(Arc::clone(&state.service), &queue, ledger, notifier).await?;

    let processor = match SimulatedPaymentProcessor::new(queue, checkout_base_url)
        .start()
        .await
    {
        Ok(processor) => processor,
        Err(e) => {
            reconciler.abort();
            return Err(ServiceError::Subscribe(e));
        }
    };

    Ok(SettlementWorkers {
        reconciler,
        processor,
    })
}
