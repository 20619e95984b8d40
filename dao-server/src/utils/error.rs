//! Unified error handling
//!
//! [`AppError`] is the application-level error enum; it converts into
//! the `{code, msg, data}` envelope via `IntoResponse`. Engine-level
//! errors (`RepoError`, gateway errors) are folded in through `From`
//! impls so handlers can use `?` everywhere.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use shared::{ApiResponse, ErrorCode};
use tracing::error;

use crate::db::repository::RepoError;

/// Application error enum
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // ========== Auth errors (4xx) ==========
    #[error("Authentication required")]
    Unauthorized,

    #[error("Session expired")]
    SessionExpired,

    #[error("Signature verification failed")]
    InvalidSignature,

    #[error("Too many failed login attempts")]
    TooManyLoginError,

    #[error("Permission denied: {0}")]
    NoPermission(String),

    // ========== Domain errors (4xx) ==========
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Comment limit reached")]
    MaxCommentCount,

    #[error("DAO name already taken: {0}")]
    DaoNameDuplicated(String),

    #[error("Already subscribed to DAO {0}")]
    AlreadySubscribed(String),

    #[error("Red packet collected completely")]
    RedpacketFinished,

    #[error("Payment notification rejected: {0}")]
    PayNotify(String),

    #[error("User {0} is pending deletion")]
    WaitForDelete(String),

    #[error("User {0} already written off")]
    UserWrittenOff(String),

    #[error("No user for address {0}")]
    NoExistUser(String),

    // ========== System errors (5xx) ==========
    #[error("Upstream failed: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Stable user-visible code for the error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Unauthorized => ErrorCode::Unauthorized,
            AppError::SessionExpired => ErrorCode::SessionExpired,
            AppError::InvalidSignature => ErrorCode::InvalidSignature,
            AppError::TooManyLoginError => ErrorCode::TooManyLoginError,
            AppError::NoPermission(_) => ErrorCode::NoPermission,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::InvalidParams(_) => ErrorCode::InvalidParams,
            AppError::MaxCommentCount => ErrorCode::MaxCommentCount,
            AppError::DaoNameDuplicated(_) => ErrorCode::CreateDaoNameDuplication,
            AppError::AlreadySubscribed(_) => ErrorCode::AlreadySubscribedDAO,
            AppError::RedpacketFinished => ErrorCode::RedpacketHasBeenCollectedCompletely,
            AppError::PayNotify(_) => ErrorCode::PayNotifyError,
            AppError::WaitForDelete(_) => ErrorCode::WaitForDelete,
            AppError::UserWrittenOff(_) => ErrorCode::UserAlreadyWrittenOff,
            AppError::NoExistUser(_) => ErrorCode::NoExistUserAddress,
            AppError::Upstream(_) => ErrorCode::UpstreamFailed,
            AppError::Database(_) | AppError::Internal(_) => ErrorCode::ServerError,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::SessionExpired | AppError::InvalidSignature => {
                StatusCode::UNAUTHORIZED
            }
            AppError::TooManyLoginError => StatusCode::TOO_MANY_REQUESTS,
            AppError::NoPermission(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::NoExistUser(_) => StatusCode::NOT_FOUND,
            AppError::InvalidParams(_) | AppError::PayNotify(_) => StatusCode::BAD_REQUEST,
            AppError::MaxCommentCount
            | AppError::DaoNameDuplicated(_)
            | AppError::AlreadySubscribed(_)
            | AppError::RedpacketFinished
            | AppError::WaitForDelete(_)
            | AppError::UserWrittenOff(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Helper constructors used across the engines
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    pub fn no_permission(msg: impl Into<String>) -> Self {
        Self::NoPermission(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        // 5xx detail stays in the log, not the envelope
        let msg = match &self {
            AppError::Database(detail) => {
                error!(target: "database", error = %detail, "Database error occurred");
                code.message().to_string()
            }
            AppError::Internal(detail) => {
                error!(target: "internal", error = %detail, "Internal error occurred");
                code.message().to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ApiResponse::<()>::error(code, msg));
        (status, body).into_response()
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::NotFound(msg),
            RepoError::Duplicate(msg) => AppError::InvalidParams(msg),
            RepoError::Validation(msg) => AppError::InvalidParams(msg),
            RepoError::Database(msg) => AppError::Database(msg),
        }
    }
}

impl From<surrealdb::Error> for AppError {
    fn from(err: surrealdb::Error) -> Self {
        AppError::Database(err.to_string())
    }
}

/// Result alias used by handlers and engines
pub type AppResult<T> = Result<T, AppError>;
