//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::gateway::handlers::health::HealthResponse;
use crate::gateway::types::{
    CompleteTaskRequest, CompleteTaskResponse, RegisterRequest, RegisterResponse,
    SetReferrerRequest, SetReferrerResponse,
};
use crate::ledger::{
    CompletedTask, LeaderboardEntry, Reference, ReferenceKind, Task, Transaction, User,
    UserProfile, UserStatus,
};

/// JWT bearer security scheme
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Token returned by POST /api/v1/auth/register",
                        ))
                        .build(),
                ),
            );
        }
    }
}

/// Main API Documentation struct
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Points Ledger API",
        version = "1.0.0",
        description = "Referral bonuses, task rewards and a points leaderboard backed by an append-only ledger."
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::user_auth::handlers::register,
        crate::gateway::handlers::task::list_tasks,
        crate::gateway::handlers::task::complete_task,
        crate::gateway::handlers::leaderboard::get_leaderboard,
        crate::gateway::handlers::user::get_user_status,
        crate::gateway::handlers::user::get_available_tasks,
        crate::gateway::handlers::user::get_transactions,
        crate::gateway::handlers::user::set_referrer,
    ),
    components(
        schemas(
            HealthResponse,
            RegisterRequest,
            RegisterResponse,
            CompleteTaskRequest,
            CompleteTaskResponse,
            SetReferrerRequest,
            SetReferrerResponse,
            User,
            UserProfile,
            UserStatus,
            Task,
            CompletedTask,
            Transaction,
            Reference,
            ReferenceKind,
            LeaderboardEntry,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Registration and token issue"),
        (name = "Users", description = "Balances, referrals and the leaderboard (auth required)"),
        (name = "Tasks", description = "Task catalog and completion (auth required)"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;
