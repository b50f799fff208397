//! API Handlers
//!
//! HTTP request handlers exposing the cache operations.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::cache::{CacheManager, Payload, StorageReport};
use crate::error::{CacheError, Result};
use crate::fetch::{CachedFetcher, Transport};
use crate::models::{
    validate_key, ClearResponse, DeleteResponse, FetchRequestBody, FetchResponse, GetResponse,
    HealthResponse, SetResponse,
};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<CacheManager>,
    pub fetcher: Arc<CachedFetcher>,
}

impl AppState {
    /// Creates a new AppState around an initialised cache manager.
    pub fn new(cache: Arc<CacheManager>, transport: Arc<dyn Transport>) -> Self {
        let fetcher = Arc::new(CachedFetcher::new(cache.clone(), transport));
        Self { cache, fetcher }
    }

    /// Rejects unregistered store names and malformed keys at the boundary.
    fn check_target(&self, store: &str, key: &str) -> Result<()> {
        self.cache.registry().descriptor_for(store)?;
        if let Some(error_msg) = validate_key(key) {
            return Err(CacheError::InvalidRequest(error_msg));
        }
        Ok(())
    }
}

/// Handler for GET /cache/:store/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path((store, key)): Path<(String, String)>,
) -> Result<Json<GetResponse>> {
    state.check_target(&store, &key)?;

    match state.cache.get(&store, &key).await {
        Some(value) => Ok(Json(GetResponse::new(store, key, value))),
        None => Err(CacheError::NotFound(key)),
    }
}

/// Handler for PUT /cache/:store/:key
///
/// The whole JSON body is the payload.
pub async fn set_handler(
    State(state): State<AppState>,
    Path((store, key)): Path<(String, String)>,
    Json(payload): Json<Payload>,
) -> Result<Json<SetResponse>> {
    state.check_target(&store, &key)?;

    let accepted = state.cache.set(&store, &key, payload).await;
    Ok(Json(SetResponse::new(store, key, accepted)))
}

/// Handler for DELETE /cache/:store/:key
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((store, key)): Path<(String, String)>,
) -> Result<Json<DeleteResponse>> {
    state.check_target(&store, &key)?;

    state.cache.remove(&store, &key).await;
    Ok(Json(DeleteResponse::new(store, key)))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.cache.clear_all().await;
    Json(ClearResponse::cleared())
}

/// Handler for GET /storage
pub async fn storage_handler(State(state): State<AppState>) -> Json<StorageReport> {
    Json(state.cache.storage_info().await)
}

/// Handler for POST /fetch
pub async fn fetch_handler(
    State(state): State<AppState>,
    Json(body): Json<FetchRequestBody>,
) -> Result<Json<FetchResponse>> {
    if let Some(error_msg) = body.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let fetched = state.fetcher.fetch(&body.request, body.options()).await?;
    Ok(Json(fetched.into()))
}

/// Handler for GET /health
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(state.cache.persistent_available()))
}
