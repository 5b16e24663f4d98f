//! Error types for OpenShelf server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Reasons the authorization gate can deny an action.
///
/// These are produced by the pure gate in `services::authz` and carry no I/O
/// context; the HTTP mapping lives here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Deny {
    #[error("Account is not active")]
    AccountInactive,
    #[error("Administrator privileges required")]
    AdminRequired,
    #[error("Staff privileges required")]
    StaffRequired,
    #[error("You may only access your own record")]
    OwnershipRequired,
}

impl Deny {
    pub fn code(&self) -> &'static str {
        match self {
            Deny::AccountInactive => "ACCOUNT_INACTIVE",
            Deny::AdminRequired => "ADMIN_REQUIRED",
            Deny::StaffRequired => "STAFF_REQUIRED",
            Deny::OwnershipRequired => "OWNERSHIP_REQUIRED",
        }
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// No, invalid, expired or stale credential. The internal reason is
    /// logged but never exposed, so a caller cannot probe which accounts
    /// exist or which check failed.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Wrong email/password on the login endpoint specifically.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Login attempt against a suspended/blocked/terminated account.
    #[error("Account is {0}")]
    AccountInactive(String),

    #[error("{0}")]
    Authorization(#[from] Deny),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{1}")]
    Conflict(&'static str, String),

    /// Lending-engine precondition failure (borrower inactive, limit
    /// reached). These are business rules, not conflicts on stored state.
    #[error("{1}")]
    BusinessRule(&'static str, String),

    #[error("Field cannot be modified: {0}")]
    ImmutableField(&'static str),

    /// Human-code generation exhausted its bounded retries or overflowed
    /// the padded width. Never retried indefinitely, never a duplicate.
    #[error("Code generation failed: {0}")]
    CodeGeneration(String),

    /// Store timeout or lost connection; safe for the caller to retry reads.
    #[error("Store unavailable: {0}")]
    TransientStore(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Conflict on the email unique index.
    pub fn email_exists() -> Self {
        AppError::Conflict(
            "EMAIL_ALREADY_EXISTS",
            "An account with this email address already exists".to_string(),
        )
    }

    /// Conflict on the external identity unique index.
    pub fn external_id_linked() -> Self {
        AppError::Conflict(
            "EXTERNAL_ID_ALREADY_LINKED",
            "This external account is already linked to another account".to_string(),
        )
    }

    /// The book already has an active or overdue loan.
    pub fn book_unavailable() -> Self {
        AppError::Conflict(
            "BOOK_UNAVAILABLE",
            "This book is already lent out".to_string(),
        )
    }
}

/// Error response body with a stable machine-readable code
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error_code: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authentication(reason) => {
                // Log the specific reason, answer with a generic 401.
                tracing::debug!("authentication rejected: {}", reason);
                (
                    StatusCode::UNAUTHORIZED,
                    "NOT_AUTHENTICATED",
                    "You are not logged in. Please log in to get access.".to_string(),
                )
            }
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "INVALID_CREDENTIALS",
                self.to_string(),
            ),
            AppError::AccountInactive(_) => {
                (StatusCode::FORBIDDEN, "ACCOUNT_INACTIVE", self.to_string())
            }
            AppError::Authorization(deny) => (StatusCode::FORBIDDEN, deny.code(), deny.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_FAILED", msg.clone()),
            AppError::Conflict(code, msg) => (StatusCode::CONFLICT, *code, msg.clone()),
            AppError::BusinessRule(code, msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, *code, msg.clone())
            }
            AppError::ImmutableField(_) => {
                (StatusCode::BAD_REQUEST, "IMMUTABLE_FIELD", self.to_string())
            }
            AppError::CodeGeneration(msg) => {
                tracing::error!("code generation failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "CODE_GENERATION_FAILED",
                    "Failed to generate a unique identifier".to_string(),
                )
            }
            AppError::TransientStore(msg) => {
                tracing::warn!("store unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_UNAVAILABLE",
                    "Storage temporarily unavailable, please retry".to_string(),
                )
            }
            AppError::Database(e @ (sqlx::Error::PoolTimedOut | sqlx::Error::Io(_))) => {
                tracing::warn!("store unavailable: {:?}", e);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "STORE_UNAVAILABLE",
                    "Storage temporarily unavailable, please retry".to_string(),
                )
            }
            AppError::Database(e) => {
                tracing::error!("database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DB_FAILURE",
                    "Database error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            error_code: code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

/// Translate sqlx errors on mutating statements, mapping unique-index
/// violations to their typed conflicts by constraint name.
pub fn map_unique_violation(err: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return match db_err.constraint() {
                Some("users_email_key") | Some("staff_email_key") => AppError::email_exists(),
                Some("users_external_id_idx") | Some("staff_external_id_idx") => {
                    AppError::external_id_linked()
                }
                Some("loans_book_active_idx") => AppError::book_unavailable(),
                Some("users_library_card_key") | Some("staff_employee_code_key") => {
                    AppError::CodeGeneration("human code collided with an existing record".to_string())
                }
                other => AppError::Conflict(
                    "DUPLICATE",
                    format!("Unique constraint violated: {}", other.unwrap_or("unknown")),
                ),
            };
        }
    }
    if matches!(err, sqlx::Error::PoolTimedOut | sqlx::Error::Io(_)) {
        return AppError::TransientStore(err.to_string());
    }
    AppError::Database(err)
}
