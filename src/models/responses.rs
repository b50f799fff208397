//! Response DTOs for the cache HTTP surface
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::Payload;
use crate::fetch::{FetchSource, Fetched};

/// Response body for GET /cache/:store/:key
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    pub store: String,
    pub key: String,
    /// The stored value
    pub value: Payload,
}

impl GetResponse {
    pub fn new(store: impl Into<String>, key: impl Into<String>, value: Payload) -> Self {
        Self {
            store: store.into(),
            key: key.into(),
            value,
        }
    }
}

/// Response body for PUT /cache/:store/:key
///
/// `accepted` is false when the payload is over the store's size cap or no
/// tier could hold it.
#[derive(Debug, Clone, Serialize)]
pub struct SetResponse {
    pub store: String,
    pub key: String,
    pub accepted: bool,
}

impl SetResponse {
    pub fn new(store: impl Into<String>, key: impl Into<String>, accepted: bool) -> Self {
        Self {
            store: store.into(),
            key: key.into(),
            accepted,
        }
    }
}

/// Response body for DELETE /cache/:store/:key
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    /// Success message
    pub message: String,
    pub store: String,
    pub key: String,
}

impl DeleteResponse {
    pub fn new(store: impl Into<String>, key: impl Into<String>) -> Self {
        let store = store.into();
        let key = key.into();
        Self {
            message: format!("Key '{}' removed from '{}'", key, store),
            store,
            key,
        }
    }
}

/// Response body for DELETE /cache
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub message: String,
}

impl ClearResponse {
    pub fn cleared() -> Self {
        Self {
            message: "All stores cleared".to_string(),
        }
    }
}

/// Response body for POST /fetch
#[derive(Debug, Clone, Serialize)]
pub struct FetchResponse {
    /// Whether the payload came from the cache, the network, or a stale copy
    pub source: FetchSource,
    pub payload: Payload,
}

impl From<Fetched> for FetchResponse {
    fn from(fetched: Fetched) -> Self {
        Self {
            source: fetched.source,
            payload: fetched.payload,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Whether the persistent tier is in use
    pub persistent_tier: bool,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy(persistent_tier: bool) -> Self {
        Self {
            status: "healthy".to_string(),
            persistent_tier,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_response_serialize() {
        let resp = GetResponse::new("api", "k1", json!({"a": 1}));
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json, json!({"store": "api", "key": "k1", "value": {"a": 1}}));
    }

    #[test]
    fn test_set_response_serialize() {
        let resp = SetResponse::new("images", "big", false);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""accepted":false"#));
    }

    #[test]
    fn test_delete_response_serialize() {
        let resp = DeleteResponse::new("api", "deleted_key");
        assert!(resp.message.contains("deleted_key"));
        assert!(resp.message.contains("api"));
    }

    #[test]
    fn test_fetch_response_from_fetched() {
        let resp = FetchResponse::from(Fetched {
            payload: json!([1]),
            source: FetchSource::Stale,
        });
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["source"], "stale");
        assert_eq!(json["payload"], json!([1]));
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy(true);
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("error"));
        assert!(json.contains("Something went wrong"));
    }
}
