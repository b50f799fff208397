//! Error types for the cache manager
//!
//! Provides unified error handling using thiserror. Only `CacheError` ever
//! reaches callers; `TierError` stays inside the orchestrator.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::models::ErrorResponse;

// == Cache Error Enum ==
/// Caller-facing error type.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found (or expired) in every tier
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Store name is not part of the registry
    #[error("Unknown store: {0}")]
    UnknownStore(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Invalid static configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Upstream request failed and nothing was cached
    #[error("Upstream request failed: {0}")]
    Network(#[from] NetworkError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

// == Tier Error Enum ==
/// Failures raised by a single storage tier.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TierError {
    /// The tier cannot be used on this platform
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Quota exhaustion or I/O fault while writing
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// A stored record could not be decoded
    #[error("corrupt entry: {0}")]
    CorruptEntry(String),

    /// The tier has no collection for this store
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    /// Any other backend failure
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<rusqlite::Error> for TierError {
    fn from(err: rusqlite::Error) -> Self {
        TierError::Backend(err.to_string())
    }
}

// == Network Error Enum ==
/// Failures of an upstream request issued by the fetch wrapper.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The request descriptor cannot be sent
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection, TLS or timeout failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-2xx status
    #[error("upstream responded with status {status}")]
    Status { status: u16 },

    /// Upstream body is not valid JSON
    #[error("invalid response body: {0}")]
    Decode(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::UnknownStore(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            CacheError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CacheError::Network(_) => StatusCode::BAD_GATEWAY,
            CacheError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache manager.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CacheError::NotFound("k".into()), StatusCode::NOT_FOUND),
            (CacheError::UnknownStore("s".into()), StatusCode::NOT_FOUND),
            (
                CacheError::InvalidRequest("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                CacheError::Network(NetworkError::Status { status: 503 }),
                StatusCode::BAD_GATEWAY,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_network_error_converts() {
        let err: CacheError = NetworkError::Transport("connection refused".into()).into();
        assert!(matches!(err, CacheError::Network(_)));
        assert!(err.to_string().contains("connection refused"));
    }
}
