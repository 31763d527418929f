use std::sync::Arc;

use axum::{
    Extension, Json,
    extract::{Path, State},
};

use super::ensure_self;
use crate::gateway::state::AppState;
use crate::gateway::types::{
    ApiResponse, ApiResult, CompleteTaskRequest, CompleteTaskResponse, ok,
};
use crate::ledger::Task;
use crate::user_auth::AuthenticatedUser;

/// Active task catalog
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    responses(
        (status = 200, description = "Active tasks", body = ApiResponse<Vec<Task>>),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn list_tasks(State(state): State<Arc<AppState>>) -> ApiResult<Vec<Task>> {
    ok(state.engine.list_tasks().await?)
}

/// Complete a task and collect its reward
///
/// POST /api/v1/users/{id}/task/complete
///
/// A task can be completed once per user. Completion and reward credit
/// commit together or not at all.
#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/task/complete",
    params(("id" = i64, Path, description = "User ID")),
    request_body = CompleteTaskRequest,
    responses(
        (status = 200, description = "Task completed", body = ApiResponse<CompleteTaskResponse>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Not the caller's account"),
        (status = 404, description = "User or task not found"),
        (status = 409, description = "Task already completed"),
        (status = 422, description = "Task inactive")
    ),
    security(("bearer_auth" = [])),
    tag = "Tasks"
)]
pub async fn complete_task(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<AuthenticatedUser>,
    Path(user_id): Path<i64>,
    Json(req): Json<CompleteTaskRequest>,
) -> ApiResult<CompleteTaskResponse> {
    ensure_self(&caller, user_id)?;

    let transaction = state.engine.complete_task(user_id, req.task_id).await?;
    ok(CompleteTaskResponse {
        task_id: req.task_id,
        reward_points: transaction.as_ref().map(|tx| tx.delta).unwrap_or(0),
        transaction,
    })
}
