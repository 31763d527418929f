use std::sync::Arc;
use std::time::Duration;

use crate::db::Database;
use crate::ledger::RewardEngine;
use crate::user_auth::JwtManager;

/// Gateway shared state
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RewardEngine>,
    pub jwt: Arc<JwtManager>,
    /// PostgreSQL pool, pinged by the health check (absent in tests)
    pub db: Option<Arc<Database>>,
    /// Per-request deadline
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        engine: Arc<RewardEngine>,
        jwt: Arc<JwtManager>,
        db: Option<Arc<Database>>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            engine,
            jwt,
            db,
            request_timeout,
        }
    }
}
