//! Board Error Types
//!
//! Job-board error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Board result type alias
pub type BoardResult<T> = Result<T, BoardError>;

/// Board error variants
#[derive(Debug, Error)]
pub enum BoardError {
    #[error("Account not found")]
    AccountNotFound,

    #[error("Payment not found")]
    PaymentNotFound,

    #[error("Withdrawal not found")]
    WithdrawalNotFound,

    #[error("Notification not found")]
    NotificationNotFound,

    /// Email already registered
    #[error("Email is already registered")]
    EmailTaken,

    /// Wrong email or password
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Missing, malformed or expired bearer token
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Supplied one-time code is wrong, already used, or never issued
    #[error("Invalid verification code")]
    InvalidCode,

    /// One-time code TTL elapsed
    #[error("Verification code has expired")]
    CodeExpired,

    /// Phone number does not normalize to the configured country format
    #[error("Invalid phone number")]
    InvalidPhone,

    #[error("Validation failed: {0}")]
    Validation(String),

    /// Account already holds an unexpired payment grant
    #[error("An active payment already covers this account")]
    DuplicatePayment,

    /// No connects left and no unlimited grant
    #[error("No connects remaining")]
    QuotaExceeded,

    #[error("Insufficient wallet balance")]
    InsufficientBalance,

    /// Withdrawal already approved or rejected
    #[error("Withdrawal has already been decided")]
    AlreadyDecided,

    /// Email provider or payment gateway failed or timed out
    #[error("Upstream service error: {0}")]
    Gateway(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl BoardError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.kind().status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            BoardError::AccountNotFound
            | BoardError::PaymentNotFound
            | BoardError::WithdrawalNotFound
            | BoardError::NotificationNotFound => ErrorKind::NotFound,
            BoardError::EmailTaken | BoardError::DuplicatePayment | BoardError::AlreadyDecided => {
                ErrorKind::Conflict
            }
            BoardError::InvalidCredentials | BoardError::Unauthenticated => ErrorKind::Unauthorized,
            BoardError::Forbidden(_) => ErrorKind::Forbidden,
            BoardError::InvalidCode
            | BoardError::InvalidPhone
            | BoardError::Validation(_)
            | BoardError::InsufficientBalance => ErrorKind::BadRequest,
            BoardError::CodeExpired => ErrorKind::Gone,
            BoardError::QuotaExceeded => ErrorKind::PaymentRequired,
            BoardError::Gateway(_) => ErrorKind::BadGateway,
            BoardError::Database(_) | BoardError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// Whether the caller should be offered the connects purchase path
    pub fn requires_purchase(&self) -> bool {
        matches!(self, BoardError::QuotaExceeded)
    }

    /// Convert to AppError
    pub fn to_app_error(&self) -> AppError {
        let err = match self {
            // Storage details stay in the logs
            BoardError::Database(_) => AppError::new(self.kind(), "Database error"),
            _ => AppError::new(self.kind(), self.to_string()),
        };

        match self {
            BoardError::QuotaExceeded => err.with_action("Purchase a connects package to keep applying"),
            BoardError::CodeExpired => err.with_action("Request a new code"),
            BoardError::DuplicatePayment => {
                err.with_action("Your current package is still active")
            }
            _ => err,
        }
    }

    /// Log the error with appropriate level
    pub(crate) fn log(&self) {
        match self {
            BoardError::Database(e) => {
                tracing::error!(error = %e, "Board database error");
            }
            BoardError::Internal(msg) => {
                tracing::error!(message = %msg, "Board internal error");
            }
            BoardError::Gateway(msg) => {
                tracing::warn!(message = %msg, "Upstream collaborator failed");
            }
            BoardError::InvalidCredentials => {
                tracing::warn!("Invalid login attempt");
            }
            BoardError::Forbidden(reason) => {
                tracing::warn!(reason = %reason, "Forbidden request");
            }
            _ => {
                tracing::debug!(error = %self, "Board error");
            }
        }
    }
}

impl IntoResponse for BoardError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}

impl From<AppError> for BoardError {
    fn from(err: AppError) -> Self {
        match err.kind() {
            ErrorKind::BadRequest => BoardError::Validation(err.message().to_string()),
            _ => BoardError::Internal(err.to_string()),
        }
    }
}
