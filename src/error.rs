/// Unified error types for MediaVault services
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type shared by both services
#[derive(Error, Debug)]
pub enum VaultError {
    /// Malformed or missing request input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Caller is not allowed to act on the resource
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Media, blob, or user absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Duplicate resource (e.g. username already taken)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Media exceeds the configured upload ceiling
    #[error("Media too large: {size} exceeds {max}")]
    MediaTooLarge { size: u64, max: u64 },

    /// Filename extension, MIME type or interpolator not in the supported set
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// Magic bytes disagree with the filename extension
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    /// On-disk byte count disagrees with the declared size
    #[error("Size mismatch during {op}: expected {expected}, got {actual}")]
    SizeMismatch {
        op: &'static str,
        expected: u64,
        actual: u64,
    },

    /// Token signature failure or expiry
    #[error("Invalid auth token: {0}")]
    InvalidToken(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl VaultError {
    /// Whether the error should be served as 404 on media endpoints.
    ///
    /// Ownership failures are folded into NotFound there so the API never
    /// reveals whether a media id exists.
    pub fn is_not_found(&self) -> bool {
        matches!(self, VaultError::NotFound(_) | VaultError::Unauthorized(_))
    }

    /// Map an IO error to NotFound when the underlying file is absent.
    pub fn from_io(err: std::io::Error, what: impl Into<String>) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            VaultError::NotFound(what.into())
        } else {
            VaultError::Io(err)
        }
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert VaultError to HTTP response
impl IntoResponse for VaultError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match &self {
            VaultError::InvalidInput(_) => {
                (StatusCode::BAD_REQUEST, "InvalidInput", self.to_string())
            }
            VaultError::MediaTooLarge { .. } => {
                (StatusCode::BAD_REQUEST, "TooLarge", self.to_string())
            }
            VaultError::UnsupportedType(_) => {
                (StatusCode::BAD_REQUEST, "UnsupportedType", self.to_string())
            }
            VaultError::TypeMismatch(_) => {
                (StatusCode::BAD_REQUEST, "TypeMismatch", self.to_string())
            }
            VaultError::Unauthorized(_) | VaultError::InvalidToken(_) => (
                StatusCode::UNAUTHORIZED,
                "Unauthorized",
                "Unauthorized".to_string(),
            ),
            VaultError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            VaultError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", self.to_string()),
            VaultError::Database(_)
            | VaultError::Io(_)
            | VaultError::SizeMismatch { .. }
            | VaultError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for MediaVault operations
pub type VaultResult<T> = Result<T, VaultError>;
