use std::sync::Arc;

use axum::extract::{Query, State};

use crate::gateway::state::AppState;
use crate::gateway::types::{ApiResponse, ApiResult, PageParams, ok};
use crate::ledger::LeaderboardEntry;

/// Users ranked by points
///
/// GET /api/v1/users/leaderboard?limit=10&offset=0
///
/// Ties are broken by user id. `limit` is clamped to 1..=100.
#[utoipa::path(
    get,
    path = "/api/v1/users/leaderboard",
    params(PageParams),
    responses(
        (status = 200, description = "Leaderboard page", body = ApiResponse<Vec<LeaderboardEntry>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_leaderboard(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PageParams>,
) -> ApiResult<Vec<LeaderboardEntry>> {
    let entries = state
        .engine
        .get_leaderboard(params.limit(), params.offset())
        .await?;
    ok(entries)
}
