//! HTTP handlers
//!
//! Handlers translate HTTP into [`RewardEngine`](crate::ledger::RewardEngine)
//! calls and back. Business rules live in the engine.

pub mod health;
pub mod leaderboard;
pub mod task;
pub mod user;

pub use health::health_check;
pub use leaderboard::get_leaderboard;
pub use task::{complete_task, list_tasks};
pub use user::{get_available_tasks, get_transactions, get_user_status, set_referrer};

use axum::http::StatusCode;

use super::types::{ApiError, api_error, error_codes};
use crate::user_auth::AuthenticatedUser;

/// Per-user routes only serve the authenticated caller
pub(crate) fn ensure_self(caller: &AuthenticatedUser, user_id: i64) -> Result<(), ApiError> {
    if caller.user_id != user_id {
        tracing::warn!(
            caller = caller.user_id,
            target = user_id,
            "Cross-user access denied"
        );
        return Err(api_error(
            StatusCode::FORBIDDEN,
            error_codes::FORBIDDEN,
            "Access to another user's data is not allowed",
        ));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_self() {
        let caller = AuthenticatedUser { user_id: 3 };
        assert!(ensure_self(&caller, 3).is_ok());

        let (status, body) = ensure_self(&caller, 4).unwrap_err();
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body.code, error_codes::FORBIDDEN);
    }
}
