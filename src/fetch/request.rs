//! Request descriptors for the cache-aside fetch wrapper.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

fn default_method() -> String {
    "GET".to_string()
}

/// Target plus every option that can change the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    /// Ordered so that the cache key does not depend on insertion order
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl FetchRequest {
    /// A plain GET of `url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: default_method(),
            headers: BTreeMap::new(),
            body: None,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// SHA-256 hex digest of the whole descriptor, so requests that differ in
    /// any option never share an entry. Methods are case-insensitive.
    pub fn cache_key(&self) -> String {
        let normalized = Self {
            method: self.method.to_ascii_uppercase(),
            ..self.clone()
        };
        let canonical =
            serde_json::to_vec(&normalized).unwrap_or_else(|_| self.url.clone().into_bytes());
        hex::encode(Sha256::digest(&canonical))
    }
}

/// Per-call switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Skip the cache check and always go to the network
    pub bypass_cache: bool,
}

impl FetchOptions {
    pub fn bypass() -> Self {
        Self { bypass_cache: true }
    }
}
