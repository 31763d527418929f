//! Ledger Error Types
//!
//! Domain rejections are expected, user-facing outcomes of a workflow.
//! Structural failures (storage unavailable, unmapped constraint violations)
//! are fatal for the request and must not leak storage detail to callers.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    // === Domain Rejections ===
    #[error("Username must be 1-64 non-blank characters")]
    InvalidUsername,

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("User {0} cannot refer themselves")]
    SelfReferral(i64),

    #[error("User {0} already has a referrer")]
    AlreadyHasReferrer(i64),

    #[error("User not found: {0}")]
    UserNotFound(i64),

    #[error("Referrer not found: {0}")]
    ReferrerNotFound(i64),

    #[error("Task not found: {0}")]
    TaskNotFound(i64),

    #[error("Task {0} is not active")]
    TaskInactive(i64),

    #[error("Task {task_id} already completed by user {user_id}")]
    TaskAlreadyCompleted { user_id: i64, task_id: i64 },

    #[error("Insufficient balance for user {0}")]
    InsufficientBalance(i64),

    #[error("Adjustment delta must be non-zero")]
    ZeroAdjustment,

    // === Structural Failures ===
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InvalidUsername => "INVALID_USERNAME",
            LedgerError::UsernameTaken(_) => "USERNAME_TAKEN",
            LedgerError::SelfReferral(_) => "SELF_REFERRAL",
            LedgerError::AlreadyHasReferrer(_) => "ALREADY_HAS_REFERRER",
            LedgerError::UserNotFound(_) => "USER_NOT_FOUND",
            LedgerError::ReferrerNotFound(_) => "REFERRER_NOT_FOUND",
            LedgerError::TaskNotFound(_) => "TASK_NOT_FOUND",
            LedgerError::TaskInactive(_) => "TASK_INACTIVE",
            LedgerError::TaskAlreadyCompleted { .. } => "TASK_ALREADY_COMPLETED",
            LedgerError::InsufficientBalance(_) => "INSUFFICIENT_BALANCE",
            LedgerError::ZeroAdjustment => "ZERO_ADJUSTMENT",
            LedgerError::DatabaseError(_) => "DATABASE_ERROR",
            LedgerError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Get HTTP status code suggestion
    pub fn http_status(&self) -> u16 {
        match self {
            LedgerError::InvalidUsername
            | LedgerError::SelfReferral(_)
            | LedgerError::ZeroAdjustment => 400,
            LedgerError::UserNotFound(_)
            | LedgerError::ReferrerNotFound(_)
            | LedgerError::TaskNotFound(_) => 404,
            LedgerError::UsernameTaken(_)
            | LedgerError::AlreadyHasReferrer(_)
            | LedgerError::TaskAlreadyCompleted { .. } => 409,
            LedgerError::TaskInactive(_) | LedgerError::InsufficientBalance(_) => 422,
            LedgerError::DatabaseError(_) | LedgerError::Internal(_) => 500,
        }
    }

    /// True for expected domain outcomes, false for structural failures
    pub fn is_rejection(&self) -> bool {
        !matches!(
            self,
            LedgerError::DatabaseError(_) | LedgerError::Internal(_)
        )
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::DatabaseError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::SelfReferral(1).code(), "SELF_REFERRAL");
        assert_eq!(
            LedgerError::TaskAlreadyCompleted {
                user_id: 1,
                task_id: 2
            }
            .code(),
            "TASK_ALREADY_COMPLETED"
        );
        assert_eq!(
            LedgerError::DatabaseError("x".into()).code(),
            "DATABASE_ERROR"
        );
    }

    #[test]
    fn test_http_status() {
        assert_eq!(LedgerError::InvalidUsername.http_status(), 400);
        assert_eq!(LedgerError::ZeroAdjustment.http_status(), 400);
        assert_eq!(LedgerError::TaskNotFound(9).http_status(), 404);
        assert_eq!(LedgerError::AlreadyHasReferrer(1).http_status(), 409);
        assert_eq!(LedgerError::TaskInactive(3).http_status(), 422);
        assert_eq!(LedgerError::Internal("boom".into()).http_status(), 500);
    }

    #[test]
    fn test_rejection_vs_structural() {
        assert!(LedgerError::UsernameTaken("bob".into()).is_rejection());
        assert!(LedgerError::InsufficientBalance(1).is_rejection());
        assert!(!LedgerError::DatabaseError("down".into()).is_rejection());
        assert!(!LedgerError::Internal("bug".into()).is_rejection());
    }

    #[test]
    fn test_display() {
        let err = LedgerError::TaskAlreadyCompleted {
            user_id: 4,
            task_id: 2,
        };
        assert_eq!(err.to_string(), "Task 2 already completed by user 4");
    }
}
