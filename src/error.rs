//! Error types for Bookhold server

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Short machine-checkable error codes returned to clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ValidationError,
    AuthenticationFailed,
    InvalidToken,
    NotFound,
    BookUnavailable,
    NotBorrowed,
    Conflict,
    StorageError,
    ServerError,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Any token failure: missing, malformed, forged, expired or wrong role
    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Book not available")]
    BookUnavailable,

    #[error("Book is not borrowed by this member")]
    NotBorrowed,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Expected business-rule refusals, rendered inline rather than as server failures
    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            AppError::Validation(_)
                | AppError::NotFound(_)
                | AppError::BookUnavailable
                | AppError::NotBorrowed
                | AppError::Conflict(_)
        )
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation(_) => ErrorCode::ValidationError,
            AppError::Authentication(_) => ErrorCode::AuthenticationFailed,
            AppError::InvalidToken(_) => ErrorCode::InvalidToken,
            AppError::NotFound(_) => ErrorCode::NotFound,
            AppError::BookUnavailable => ErrorCode::BookUnavailable,
            AppError::NotBorrowed => ErrorCode::NotBorrowed,
            AppError::Conflict(_) => ErrorCode::Conflict,
            AppError::Storage(_) => ErrorCode::StorageError,
            AppError::Internal(_) => ErrorCode::ServerError,
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = e {
            if db.is_unique_violation() {
                return AppError::Conflict("Username already registered".to_string());
            }
        }
        AppError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Storage(format!("Malformed document: {}", e))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let message = fields
            .first()
            .and_then(|(field, errs)| {
                errs.first().map(|err| match &err.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid value for {}", field),
                })
            })
            .unwrap_or_else(|| "Invalid input".to_string());

        AppError::Validation(message)
    }
}

/// Malformed or incomplete request bodies are validation failures
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let detail = rejection.body_text();
        match missing_field(&detail) {
            Some(field) => AppError::Validation(format!("{} is required", capitalize(field))),
            None => AppError::Validation(detail),
        }
    }
}

/// Field name from serde's "missing field `name`" message
fn missing_field(detail: &str) -> Option<&str> {
    let rest = detail.split("missing field `").nth(1)?;
    rest.split('`').next().filter(|field| !field.is_empty())
}

fn capitalize(field: &str) -> String {
    let mut chars = field.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Error response body, shaped like the success envelope
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    /// Always null
    pub data: Option<String>,
    /// Short client-safe message
    pub error: String,
    /// HTTP status code
    pub status: u16,
    /// Machine-checkable error code
    pub code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::InvalidToken(reason) => {
                tracing::debug!("Rejected token: {}", reason);
                (StatusCode::UNAUTHORIZED, "Login required".to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BookUnavailable | AppError::NotBorrowed => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Server error".to_string())
            }
        };

        let body = Json(ErrorResponse {
            data: None,
            error: message,
            status: status.as_u16(),
            code: format!("{:?}", code),
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
