use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// ApiError
///
/// The single error taxonomy surfaced by handlers, the auth extractor and the
/// artifact coordinator. Every variant maps to exactly one HTTP status and a
/// `{"error": "..."}` body, so each failure path stays distinguishable to clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // --- Authentication (401) ---
    #[error("Missing Authorization header")]
    MissingCredentials,
    #[error("Malformed Authorization header")]
    MalformedCredentials,
    /// Deliberately silent about which half of the credential pair was wrong.
    #[error("Invalid username or password")]
    InvalidCredentials,

    // --- Authorization & lookups ---
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidReference(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    PayloadTooLarge(String),

    // --- Artifact store (500) ---
    #[error("Failed to write trace to blob store")]
    BlobWriteFailed,
    #[error("Failed to delete trace from blob store")]
    BlobDeleteFailed,
    #[error("Could not save trace metadata")]
    MetadataWriteFailed,
    #[error("Could not delete trace metadata")]
    MetadataDeleteFailed,

    // --- Infrastructure (500) ---
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingCredentials
            | ApiError::MalformedCredentials
            | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::InvalidReference(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::BlobWriteFailed
            | ApiError::BlobDeleteFailed
            | ApiError::MetadataWriteFailed
            | ApiError::MetadataDeleteFailed
            | ApiError::Database(_)
            | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message placed in the response body. Database and internal details
    /// stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            ApiError::Database(_) | ApiError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }

    pub fn bad_request(what: impl Into<String>) -> Self {
        ApiError::BadRequest(what.into())
    }

    /// Unique and foreign-key violations become `Conflict`; any other store error
    /// stays a database error.
    pub fn from_constraint(err: sqlx::Error, conflict: impl Into<String>) -> Self {
        let violated = err
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation() || db.is_foreign_key_violation());
        if violated {
            ApiError::Conflict(conflict.into())
        } else {
            ApiError::Database(err)
        }
    }
}

/// A body over `MAX_UPLOAD_BYTES` surfaces here as a 413; every other parse failure is a 400.
impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge(format!("Upload exceeds size limit: {}", err.body_text()))
        } else {
            ApiError::BadRequest(format!("Invalid multipart body: {}", err.body_text()))
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Database(_) | ApiError::Internal(_) = &self {
            tracing::error!(error = %self, "request failed with internal error");
        }

        let status = self.status();
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
