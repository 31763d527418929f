//! Points Ledger server
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌──────────────┐    ┌────────────┐
//! │  Config  │───▶│ Gateway  │───▶│ RewardEngine │───▶│ PostgreSQL │
//! │  (YAML)  │    │ (axum)   │    │ (one UoW per │    │  (sqlx)    │
//! └──────────┘    └──────────┘    │   request)   │    └────────────┘
//!                                 └──────────────┘
//! ```
//!
//! Usage: `points-ledger [--env dev|prod] [--port 8080]`

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, ensure};

use points_ledger::config::AppConfig;
use points_ledger::db::Database;
use points_ledger::gateway::{self, state::AppState};
use points_ledger::ledger::{PgLedger, RewardEngine};
use points_ledger::user_auth::JwtManager;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config = AppConfig::load(&env)?;
    let _log_guard = points_ledger::logging::init_logging(&app_config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        git_hash = env!("GIT_HASH"),
        "Starting Points Ledger in {} mode",
        env
    );

    ensure!(
        !app_config.jwt.secret.is_empty(),
        "jwt.secret is empty; set JWT_SECRET"
    );

    let db = Database::connect(&app_config.postgres_url)
        .await
        .context("Failed to connect to PostgreSQL")?;
    db.migrate().await.context("Failed to apply migrations")?;
    let db = Arc::new(db);

    let storage = Arc::new(PgLedger::new(db.pool().clone()));
    let engine = Arc::new(RewardEngine::new(storage, app_config.rewards));
    let jwt = Arc::new(JwtManager::new(
        &app_config.jwt.secret,
        app_config.jwt.ttl_hours,
    ));

    let state = Arc::new(AppState::new(
        engine,
        jwt,
        Some(db),
        Duration::from_secs(app_config.gateway.request_timeout_secs),
    ));

    let port = get_port_override().unwrap_or(app_config.gateway.port);
    gateway::run_server(&app_config.gateway.host, port, state).await
}
