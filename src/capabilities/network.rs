//! Generic request primitive.
//!
//! # Responsibilities
//! - Describe a request as `(url, method, headers)`
//! - Describe a completed exchange as `(status, body)`
//! - Keep transport failures distinct from non-success responses
//!
//! # Design Decisions
//! - A non-2xx response is still `Ok`; only an exchange that could not
//!   complete is an error
//! - No per-request timeout is imposed here; the host client decides

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Header recognised by the interceptor as an explicit opt-out.
pub const SUPPRESS_HEADER: &str = "x-suppress-error-logging";

const USER_AGENT: &str = concat!("diagnostics-collector/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub url: String,
    pub method: Method,
    pub headers: Vec<(String, String)>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: Vec::new(),
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("authorization", format!("Bearer {}", token))
    }

    /// Mark the request as expected to fail sometimes; failures are not captured.
    pub fn silent(self) -> Self {
        self.header(SUPPRESS_HEADER, "1")
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A completed exchange, successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub status_text: String,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        let status_text = reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();
        Self {
            status,
            status_text,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// The request could not complete.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request timed out")]
    Timeout,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("transport error: {0}")]
    Other(String),
}

/// The host's request primitive.
#[async_trait]
pub trait Network: Send + Sync {
    async fn perform(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[async_trait]
impl<N: Network + ?Sized> Network for Arc<N> {
    async fn perform(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).perform(request).await
    }
}

/// [`Network`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestNetwork {
    client: reqwest::Client,
}

impl ReqwestNetwork {
    pub fn new() -> Result<Self, TransportError> {
        Self::from_builder(Self::builder())
    }

    /// Build with a request timeout applied by the client.
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        Self::from_builder(Self::builder().timeout(timeout))
    }

    fn builder() -> reqwest::ClientBuilder {
        reqwest::Client::builder().user_agent(USER_AGENT)
    }

    fn from_builder(builder: reqwest::ClientBuilder) -> Result<Self, TransportError> {
        let client = builder
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Network for ReqwestNetwork {
    async fn perform(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
        };

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let body = response.text().await.map_err(classify)?;

        Ok(HttpResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else if error.is_builder() {
        TransportError::InvalidRequest(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builders() {
        let req = HttpRequest::get("http://example.test/a")
            .bearer("abc")
            .silent();
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.header_value("Authorization"), Some("Bearer abc"));
        assert_eq!(req.header_value("X-Suppress-Error-Logging"), Some("1"));
        assert_eq!(req.header_value("missing"), None);
    }

    #[test]
    fn test_response_classes() {
        let ok = HttpResponse::new(204, "");
        assert!(ok.is_success());
        assert!(!ok.is_client_error());

        let not_found = HttpResponse::new(404, "nope");
        assert!(!not_found.is_success());
        assert!(not_found.is_client_error());
        assert_eq!(not_found.status_text, "Not Found");

        let unavailable = HttpResponse::new(503, "");
        assert!(!unavailable.is_client_error());
    }

    #[tokio::test]
    async fn test_timeout_client_sends_user_agent() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 1024];
            while !raw.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                raw.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\n{}")
                .await
                .unwrap();
            String::from_utf8_lossy(&raw).to_lowercase()
        });

        let network = ReqwestNetwork::with_timeout(Duration::from_secs(5)).unwrap();
        let response = network
            .perform(HttpRequest::get(format!("http://{}/ping", addr)))
            .await
            .unwrap();
        assert_eq!(response.status, 200);

        let request = server.await.unwrap();
        assert!(request.contains(&format!("user-agent: {}", USER_AGENT.to_lowercase())));
    }
}
