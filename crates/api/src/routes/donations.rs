//! Donation endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{DonationId, PostId, UserId};
use domain::DonationShort;
use donation_service::DonationService;
use donation_store::DonationStore;
use serde::{Deserialize, Serialize};
use settlement::InMemorySettlementQueue;

use crate::error::ApiError;
use crate::profiles::{ProfileDirectory, UserSummary};
use crate::session::CurrentUser;

/// Shared application state accessible from all handlers.
pub struct AppState<S: DonationStore> {
    pub service: Arc<DonationService<S, InMemorySettlementQueue>>,
    pub profiles: Arc<dyn ProfileDirectory>,
}

// -- Request types --

#[derive(Deserialize)]
pub struct CreateDonationRequest {
    /// Receiving user.
    pub user: String,
    pub post: Option<String>,
    pub amount: u64,
}

#[derive(Deserialize)]
pub struct LookupRequest {
    pub ids: Vec<DonationId>,
}

// -- Response types --

#[derive(Serialize)]
pub struct DonationCreatedResponse {
    pub id: DonationId,
}

#[derive(Serialize)]
pub struct UsersResponse {
    pub users: Vec<UserSummary>,
}

#[derive(Serialize)]
pub struct AmountResponse {
    pub amount: u64,
}

#[derive(Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Serialize)]
pub struct LookupResponse {
    pub donations: Vec<DonationShort>,
}

// -- Handlers --

/// POST /donations: pledge a donation from the current user.
#[tracing::instrument(skip_all)]
pub async fn create<S: DonationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    from: CurrentUser,
    Json(req): Json<CreateDonationRequest>,
) -> Result<(StatusCode, Json<DonationCreatedResponse>), ApiError> {
    let post = req.post.and_then(PostId::non_empty);
    let id = state
        .service
        .make_donation(from.0, UserId::new(req.user), post, req.amount)
        .await?;

    Ok((StatusCode::CREATED, Json(DonationCreatedResponse { id })))
}

/// GET /users/{id}/donors: users with a confirmed donation to `id`.
pub async fn donors_of_user<S: DonationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    viewer: CurrentUser,
    Path(user): Path<String>,
) -> Result<Json<UsersResponse>, ApiError> {
    let donors = state.service.donors_of_user(&UserId::new(user)).await?;
    summarize(&state, &donors, &viewer.0).await
}

/// GET /posts/{id}/donors: users with a confirmed donation attributed to `id`.
pub async fn donors_of_post<S: DonationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    viewer: CurrentUser,
    Path(post): Path<String>,
) -> Result<Json<UsersResponse>, ApiError> {
    let donors = state.service.donors_of_post(&PostId::new(post)).await?;
    summarize(&state, &donors, &viewer.0).await
}

/// GET /users/{id}/recipients: users `id` has donated to.
pub async fn recipients_of_user<S: DonationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    viewer: CurrentUser,
    Path(user): Path<String>,
) -> Result<Json<UsersResponse>, ApiError> {
    let recipients = state
        .service
        .recipients_donated_by(&UserId::new(user))
        .await?;
    summarize(&state, &recipients, &viewer.0).await
}

/// GET /me/recipients: users the current user has donated to.
pub async fn my_recipients<S: DonationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    viewer: CurrentUser,
) -> Result<Json<UsersResponse>, ApiError> {
    let recipients = state.service.recipients_donated_by(&viewer.0).await?;
    summarize(&state, &recipients, &viewer.0).await
}

/// GET /me/donations/amount: confirmed total received by the current user.
pub async fn my_amount<S: DonationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    user: CurrentUser,
) -> Result<Json<AmountResponse>, ApiError> {
    let amount = state.service.total_confirmed_amount(&user.0).await?;
    Ok(Json(AmountResponse { amount }))
}

/// GET /users/{id}/donations/count: confirmed donations received by `id`.
pub async fn count<S: DonationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(user): Path<String>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.service.confirmed_count(&UserId::new(user)).await?;
    Ok(Json(CountResponse { count }))
}

/// POST /donations/lookup: `{id, amount}` for each known donation.
pub async fn lookup<S: DonationStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<LookupRequest>,
) -> Result<Json<LookupResponse>, ApiError> {
    let donations = state.service.donations_by_ids(&req.ids).await?;
    Ok(Json(LookupResponse { donations }))
}

async fn summarize<S: DonationStore>(
    state: &AppState<S>,
    users: &[UserId],
    viewer: &UserId,
) -> Result<Json<UsersResponse>, ApiError> {
    let users = state.profiles.summaries(users, viewer).await?;
    Ok(Json(UsersResponse { users }))
}
