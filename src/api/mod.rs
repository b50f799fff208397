//! API Module
//!
//! HTTP handlers and routing exposing the cache to the rest of the platform.
//!
//! # Endpoints
//! - `GET|PUT|DELETE /cache/:store/:key` - Single entry operations
//! - `DELETE /cache` - Clear every store
//! - `GET /storage` - Usage report
//! - `POST /fetch` - Cache-aside upstream request
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
