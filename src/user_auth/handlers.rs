use axum::{Json, extract::State};
use std::sync::Arc;

use crate::gateway::state::AppState;
use crate::gateway::types::{ApiResponse, ApiResult, RegisterRequest, RegisterResponse, created};
use crate::ledger::User;

/// Register a new user
///
/// POST /api/v1/auth/register
///
/// With `referrer_id`, both referral bonuses are credited in the same
/// commit as the new account. The account is committed before the token
/// is issued, so a token failure still answers 201 without a token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = ApiResponse<RegisterResponse>),
        (status = 400, description = "Invalid username"),
        (status = 404, description = "Referrer not found"),
        (status = 409, description = "Username already taken"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<RegisterResponse> {
    let user = state
        .engine
        .create_user(&req.username, req.referrer_id)
        .await?;

    let token = state.jwt.issue(user.id);
    created(registered(user, token))
}

fn registered(user: User, token: anyhow::Result<String>) -> RegisterResponse {
    let token = match token {
        Ok(token) => Some(token),
        Err(e) => {
            tracing::error!(user_id = user.id, "Token generation failed for committed user: {:?}", e);
            None
        }
    };
    RegisterResponse { user, token }
}
