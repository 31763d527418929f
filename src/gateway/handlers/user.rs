use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};

use super::ensure_self;
use crate::gateway::state::AppState;
use crate::gateway::types::{
    ApiResponse, ApiResult, PageParams, SetReferrerRequest, SetReferrerResponse, ok,
};
use crate::ledger::{Task, Transaction, UserStatus};
use crate::user_auth::AuthenticatedUser;

/// Balance, referral count and completed tasks of the caller
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/status",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User status", body = ApiResponse<UserStatus>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the caller's account"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user_status(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(user_id): Path<i64>,
) -> ApiResult<UserStatus> {
    ensure_self(&caller, user_id)?;
    ok(state.engine.get_status(user_id).await?)
}

/// Active tasks the caller has not completed yet
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/tasks/available",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "Available tasks", body = ApiResponse<Vec<Task>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the caller's account"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn get_available_tasks(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(user_id): Path<i64>,
) -> ApiResult<Vec<Task>> {
    ensure_self(&caller, user_id)?;
    ok(state.engine.list_available_tasks(user_id).await?)
}

/// Point history, newest first
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/transactions",
    params(
        ("id" = i64, Path, description = "User ID"),
        PageParams
    ),
    responses(
        (status = 200, description = "Transaction page", body = ApiResponse<Vec<Transaction>>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the caller's account"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_transactions(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(user_id): Path<i64>,
    Query(params): Query<PageParams>,
) -> ApiResult<Vec<Transaction>> {
    ensure_self(&caller, user_id)?;
    let transactions = state
        .engine
        .get_transactions(user_id, params.limit(), params.offset())
        .await?;
    ok(transactions)
}

/// Link the caller to a referrer
///
/// POST /api/v1/users/{id}/referrer
///
/// A referrer can be set once. Both referral bonuses are credited in the
/// same commit as the link.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/referrer",
    params(("id" = i64, Path, description = "User ID")),
    request_body = SetReferrerRequest,
    responses(
        (status = 200, description = "Referrer set", body = ApiResponse<SetReferrerResponse>),
        (status = 400, description = "Self referral"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the caller's account"),
        (status = 404, description = "User or referrer not found"),
        (status = 409, description = "Referrer already set")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn set_referrer(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(user_id): Path<i64>,
    Json(req): Json<SetReferrerRequest>,
) -> ApiResult<SetReferrerResponse> {
    ensure_self(&caller, user_id)?;
    state.engine.set_referrer(user_id, req.referrer_id).await?;
    ok(SetReferrerResponse {
        user_id,
        referrer_id: req.referrer_id,
    })
}
