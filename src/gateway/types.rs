//! API Response types and error codes
//!
//! - `ApiResponse<T>`: Unified response wrapper
//! - `error_codes`: Standard error code constants
//! - Request/response DTOs

use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::ledger::{LedgerError, Transaction, User};

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// All API responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - data: actual data (success) or null (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "ok".to_string(),
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

/// Error half of every handler result
pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

/// Handler result: status plus envelope on both sides
pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

pub fn api_error(status: StatusCode, code: i32, msg: impl Into<String>) -> ApiError {
    (status, Json(ApiResponse::<()>::error(code, msg)))
}

/// 200 OK with data
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

/// 201 Created with data
pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

/// Translate a ledger outcome into an HTTP error.
///
/// Rejections carry their message to the caller. Structural failures are
/// logged and replaced by a generic message.
impl From<LedgerError> for (StatusCode, Json<ApiResponse<()>>) {
    fn from(e: LedgerError) -> Self {
        let status =
            StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if e.is_rejection() {
            tracing::warn!(code = e.code(), "Request rejected: {}", e);
            api_error(status, error_codes::for_ledger_error(&e), e.to_string())
        } else {
            tracing::error!(code = e.code(), "Request failed: {}", e);
            api_error(status, error_codes::INTERNAL_ERROR, "Internal server error")
        }
    }
}

// ============================================================================
// Request DTOs
// ============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "alice")]
    pub username: String,
    /// Existing user who referred this one
    #[schema(example = 1)]
    pub referrer_id: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteTaskRequest {
    #[schema(example = 1)]
    pub task_id: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SetReferrerRequest {
    #[schema(example = 1)]
    pub referrer_id: i64,
}

/// Pagination query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageParams {
    /// Page size (1-100, default 10)
    pub limit: Option<i64>,
    /// Rows to skip (default 0)
    pub offset: Option<i64>,
}

impl PageParams {
    pub const DEFAULT_LIMIT: i64 = 10;

    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }

    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0)
    }
}

// ============================================================================
// Response DTOs
// ============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user: User,
    /// Bearer token for the protected routes. Absent if issuing failed
    /// after the account was committed; the account still exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CompleteTaskResponse {
    pub task_id: i64,
    /// Points credited (0 for tasks without reward)
    pub reward_points: i64,
    pub transaction: Option<Transaction>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SetReferrerResponse {
    pub user_id: i64,
    pub referrer_id: i64,
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    use crate::ledger::LedgerError;

    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_BALANCE: i32 = 1002;
    pub const USERNAME_TAKEN: i32 = 1101;
    pub const SELF_REFERRAL: i32 = 1102;
    pub const ALREADY_HAS_REFERRER: i32 = 1103;
    pub const TASK_INACTIVE: i32 = 1201;
    pub const TASK_ALREADY_COMPLETED: i32 = 1202;

    // Auth errors (2xxx)
    pub const MISSING_AUTH: i32 = 2001;
    pub const AUTH_FAILED: i32 = 2002;
    pub const FORBIDDEN: i32 = 2003;

    // Resource errors (4xxx)
    pub const USER_NOT_FOUND: i32 = 4001;
    pub const REFERRER_NOT_FOUND: i32 = 4002;
    pub const TASK_NOT_FOUND: i32 = 4003;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const REQUEST_TIMEOUT: i32 = 5002;

    pub fn for_ledger_error(e: &LedgerError) -> i32 {
        match e {
            LedgerError::InvalidUsername | LedgerError::ZeroAdjustment => INVALID_PARAMETER,
            LedgerError::UsernameTaken(_) => USERNAME_TAKEN,
            LedgerError::SelfReferral(_) => SELF_REFERRAL,
            LedgerError::AlreadyHasReferrer(_) => ALREADY_HAS_REFERRER,
            LedgerError::UserNotFound(_) => USER_NOT_FOUND,
            LedgerError::ReferrerNotFound(_) => REFERRER_NOT_FOUND,
            LedgerError::TaskNotFound(_) => TASK_NOT_FOUND,
            LedgerError::TaskInactive(_) => TASK_INACTIVE,
            LedgerError::TaskAlreadyCompleted { .. } => TASK_ALREADY_COMPLETED,
            LedgerError::InsufficientBalance(_) => INSUFFICIENT_BALANCE,
            LedgerError::DatabaseError(_) | LedgerError::Internal(_) => INTERNAL_ERROR,
        }
    }
}
