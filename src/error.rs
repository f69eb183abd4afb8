use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by the language, text and group stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested row does not exist.
    #[error("not found")]
    NotFound,

    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request was cancelled while waiting for the store.
    #[error("request cancelled")]
    Cancelled,

    /// The request deadline passed while waiting for the store.
    #[error("request deadline exceeded")]
    TimedOut,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Classified outcome of a failed text resolution.
///
/// `InvalidRequest` and `NotFound` are expected client-facing results.
/// `Internal` keeps the store failure for server-side logging only; it is
/// never rendered into a response.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{0}")]
    InvalidRequest(String),

    #[error("not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(#[source] StoreError),
}

impl ResolveError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ResolveError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ResolveError::NotFound => StatusCode::NOT_FOUND,
            ResolveError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show to the caller.
    pub fn public_message(&self) -> String {
        match self {
            ResolveError::InvalidRequest(msg) => msg.clone(),
            ResolveError::NotFound => "not found".to_string(),
            ResolveError::Internal(_) => "internal server error".to_string(),
        }
    }
}

/// JSON body sent with every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub status: u16,
    pub message: String,
}

impl ErrorBody {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status: status.as_u16(),
            message: message.into(),
        }
    }
}

impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorBody::new(status, self.public_message());
        (status, Json(body)).into_response()
    }
}
