//! Errors surfaced by the query path and their HTTP mapping.

use axum::{http::StatusCode, response::IntoResponse, response::Response, Json};
use product_search_repository::SearchIndexError;
use thiserror::Error;

/// Errors returned by the query service.
#[derive(Error, Debug)]
pub enum QueryError {
    /// Missing or invalid request parameters (400).
    #[error("{0}")]
    Validation(String),

    /// Unknown product identifier (404).
    #[error("{0}")]
    NotFound(String),

    /// The search engine failed (500).
    #[error("{0}")]
    Backend(String),
}

impl QueryError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a not-found error.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a backend error.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<SearchIndexError> for QueryError {
    fn from(err: SearchIndexError) -> Self {
        match err {
            SearchIndexError::ValidationError(msg) => Self::Validation(msg),
            other => Self::Backend(other.to_string()),
        }
    }
}

impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(serde_json::json!({
            "status": "error",
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}
