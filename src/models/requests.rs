//! Request DTOs for the cache HTTP surface
//!
//! Defines the structure of incoming HTTP request bodies.

use serde::Deserialize;

use crate::cache::MAX_KEY_LENGTH;
use crate::fetch::{FetchOptions, FetchRequest};

/// Validates a cache key taken from the path.
///
/// Returns an error message if validation fails, None if valid.
pub fn validate_key(key: &str) -> Option<String> {
    if key.is_empty() {
        return Some("Key cannot be empty".to_string());
    }
    if key.len() > MAX_KEY_LENGTH {
        return Some(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        ));
    }
    None
}

/// Request body for POST /fetch
///
/// # Fields
/// - `url`, `method`, `headers`, `body`: the upstream request
/// - `bypass_cache`: skip the cache check (defaults to false)
#[derive(Debug, Clone, Deserialize)]
pub struct FetchRequestBody {
    #[serde(flatten)]
    pub request: FetchRequest,
    #[serde(default)]
    pub bypass_cache: bool,
}

impl FetchRequestBody {
    /// Validates the request data
    pub fn validate(&self) -> Option<String> {
        let url = self.request.url.trim();
        if url.is_empty() {
            return Some("URL cannot be empty".to_string());
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Some("URL must use http or https".to_string());
        }
        None
    }

    pub fn options(&self) -> FetchOptions {
        FetchOptions {
            bypass_cache: self.bypass_cache,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_body_deserialize() {
        let json = r#"{"url": "https://example.com/api", "headers": {"accept": "application/json"}}"#;
        let req: FetchRequestBody = serde_json::from_str(json).unwrap();
        assert_eq!(req.request.url, "https://example.com/api");
        assert_eq!(req.request.method, "GET");
        assert_eq!(req.request.headers["accept"], "application/json");
        assert!(!req.bypass_cache);
    }

    #[test]
    fn test_fetch_body_with_bypass() {
        let json = r#"{"url": "https://example.com/api", "bypass_cache": true}"#;
        let req: FetchRequestBody = serde_json::from_str(json).unwrap();
        assert!(req.options().bypass_cache);
    }

    #[test]
    fn test_validate_url() {
        let mut req: FetchRequestBody =
            serde_json::from_str(r#"{"url": "ftp://example.com"}"#).unwrap();
        assert!(req.validate().is_some());

        req.request.url = String::new();
        assert!(req.validate().is_some());

        req.request.url = "http://example.com".to_string();
        assert!(req.validate().is_none());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("").is_some());
        assert!(validate_key(&"x".repeat(MAX_KEY_LENGTH + 1)).is_some());
        assert!(validate_key("chapter-1").is_none());
    }
}
