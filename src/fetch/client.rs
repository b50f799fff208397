//! Cache-aside fetch wrapper.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::{FetchOptions, FetchRequest, Transport};
use crate::cache::{CacheManager, Lookup, Payload, API_STORE};
use crate::error::NetworkError;

/// Where a fetched payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchSource {
    /// Valid cached entry, no network activity
    Cache,
    /// Fresh upstream response
    Network,
    /// Previously cached response served because the network failed
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fetched {
    pub payload: Payload,
    pub source: FetchSource,
}

// == Cached Fetcher ==
/// Checks the cache, goes to the network on a miss, stores successful
/// responses, and serves a stale copy when the network fails.
pub struct CachedFetcher {
    cache: Arc<CacheManager>,
    transport: Arc<dyn Transport>,
    store: String,
}

impl CachedFetcher {
    /// Caches responses in the `api` store.
    pub fn new(cache: Arc<CacheManager>, transport: Arc<dyn Transport>) -> Self {
        Self::with_store(cache, transport, API_STORE)
    }

    pub fn with_store(cache: Arc<CacheManager>, transport: Arc<dyn Transport>, store: impl Into<String>) -> Self {
        Self {
            cache,
            transport,
            store: store.into(),
        }
    }

    // == Fetch ==
    /// Runs one cache-aside request.
    ///
    /// Only successful responses are cached. On a network failure any copy
    /// still physically present is returned, including one past its TTL;
    /// without such a copy the network error is returned unchanged.
    pub async fn fetch(&self, request: &FetchRequest, options: FetchOptions) -> Result<Fetched, NetworkError> {
        let key = request.cache_key();
        let mut stale = None;

        if !options.bypass_cache {
            match self.cache.lookup(&self.store, &key).await {
                Lookup::Fresh(payload) => {
                    debug!("Serving {} {} from cache", request.method, request.url);
                    return Ok(Fetched {
                        payload,
                        source: FetchSource::Cache,
                    });
                }
                Lookup::Expired(payload) => stale = Some(payload),
                Lookup::Miss => {}
            }
        }

        match self.transport.send(request).await {
            Ok(payload) => {
                if !self.cache.set(&self.store, &key, payload.clone()).await {
                    debug!("Response for {} was not cached", request.url);
                }
                Ok(Fetched {
                    payload,
                    source: FetchSource::Network,
                })
            }
            Err(err) => {
                if stale.is_none() && options.bypass_cache {
                    stale = match self.cache.lookup(&self.store, &key).await {
                        Lookup::Fresh(payload) | Lookup::Expired(payload) => Some(payload),
                        Lookup::Miss => None,
                    };
                }

                match stale {
                    Some(payload) => {
                        warn!(
                            "Request to {} failed ({}), serving cached response",
                            request.url, err
                        );
                        Ok(Fetched {
                            payload,
                            source: FetchSource::Stale,
                        })
                    }
                    None => Err(err),
                }
            }
        }
    }
}
