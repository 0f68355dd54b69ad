//! Transport injection seam (spec.md §9 "Transport injection"), generalized
//! from the teacher's `http::HTTPClient` trait down to the single-method
//! capability the design notes call for.

use async_trait::async_trait;
use http::{Request, Response};

#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct TransportError(pub String);

/// A capability to exchange one HTTP request for one response. The default
/// binding wraps `reqwest`; tests inject a stub instead.
#[async_trait]
pub trait SendTransport: Send + Sync {
    async fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, TransportError>;
}

/// Default production transport.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SendTransport for ReqwestTransport {
    async fn send(&self, request: Request<Vec<u8>>) -> Result<Response<Vec<u8>>, TransportError> {
        let (parts, body) = request.into_parts();

        let url = parts.uri.to_string();
        let method = reqwest::Method::from_bytes(parts.method.as_str().as_bytes())
            .map_err(|e| TransportError(e.to_string()))?;

        let mut builder = self.client.request(method, &url);
        for (name, value) in parts.headers.iter() {
            builder = builder.header(name.as_str(), value.as_bytes());
        }
        builder = builder.body(body);

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError(e.to_string()))?;

        let mut builder = Response::builder().status(status.as_u16());
        for (name, value) in headers.iter() {
            builder = builder.header(name, value);
        }
        builder
            .body(body.to_vec())
            .map_err(|e| TransportError(e.to_string()))
    }
}
