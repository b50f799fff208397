//! Fetch Module
//!
//! Cache-aside wrapper around upstream requests. Successful responses land in
//! the `api` store keyed by a digest of the full request descriptor.

mod client;
mod request;
mod transport;

pub use client::{CachedFetcher, FetchSource, Fetched};
pub use request::{FetchOptions, FetchRequest};
pub use transport::{HttpTransport, Transport};
