//! Network layer used by the fetch wrapper.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};

use super::FetchRequest;
use crate::cache::Payload;
use crate::error::NetworkError;

/// Performs one upstream request.
///
/// Only 2xx responses with a JSON body are `Ok`; transport failures and
/// every other status are `Err`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &FetchRequest) -> Result<Payload, NetworkError>;
}

// == HTTP Transport ==
/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, NetworkError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| NetworkError::Transport(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &FetchRequest) -> Result<Payload, NetworkError> {
        let method = Method::from_bytes(request.method.to_ascii_uppercase().as_bytes())
            .map_err(|_| NetworkError::InvalidRequest(format!("method '{}'", request.method)))?;

        let mut builder = self.client.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|err| NetworkError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                status: status.as_u16(),
            });
        }

        response
            .json::<Payload>()
            .await
            .map_err(|err| NetworkError::Decode(err.to_string()))
    }
}
