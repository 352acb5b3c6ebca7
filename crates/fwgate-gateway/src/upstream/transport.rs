//! Transport to the upstream platform.
//!
//! [`UpstreamTransport`] is the seam between the gateway and the network.
//! Production uses [`HttpTransport`]; tests script responses instead.

use async_trait::async_trait;
use axum::http::{header, Method};
use bytes::Bytes;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::domain::config::{Secret, UpstreamConfig};

/// Expected response representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accept {
    Json,
    Image,
}

impl Accept {
    fn header_value(&self) -> &'static str {
        match self {
            Accept::Json => "application/json",
            Accept::Image => "image/png, image/*",
        }
    }
}

/// One outbound call.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub accept: Accept,
}

impl UpstreamRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::POST, url).with_body(body)
    }

    pub fn put(url: impl Into<String>, body: Value) -> Self {
        Self::new(Method::PUT, url).with_body(body)
    }

    fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: None,
            accept: Accept::Json,
        }
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn accepting(mut self, accept: Accept) -> Self {
        self.accept = accept;
        self
    }
}

/// Raw upstream answer, any status.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// JSON response with the given status.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: Bytes::from(body.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport failures. Messages never carry URLs or credentials.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("upstream request timed out")]
    Timeout,
    #[error("could not connect to upstream: {0}")]
    Connect(String),
    #[error("upstream transport error: {0}")]
    Other(String),
}

/// Executes upstream calls.
#[async_trait]
pub trait UpstreamTransport: Send + Sync {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError>;
}

/// `reqwest`-backed transport with one shared client and basic auth.
pub struct HttpTransport {
    client: reqwest::Client,
    username: String,
    password: Secret,
}

impl HttpTransport {
    pub fn new(config: &UpstreamConfig) -> Result<Self, TransportError> {
        if !config.ssl_verify {
            warn!("Upstream TLS certificate verification disabled");
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .danger_accept_invalid_certs(!config.ssl_verify)
            .build()
            .map_err(|e| TransportError::Other(e.without_url().to_string()))?;

        Ok(Self {
            client,
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }
}

#[async_trait]
impl UpstreamTransport for HttpTransport {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .basic_auth(&self.username, Some(self.password.expose()))
            .header(header::ACCEPT, request.accept.header_value());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        debug!(method = %request.method, "Sending upstream request");
        let response = builder.send().await.map_err(classify)?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().await.map_err(classify)?;

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }
}

fn classify(error: reqwest::Error) -> TransportError {
    let error = error.without_url();
    if error.is_timeout() {
        warn!("Upstream request timed out");
        TransportError::Timeout
    } else if error.is_connect() || error.is_request() {
        warn!(error = %error, "Upstream connection failed");
        TransportError::Connect(error.to_string())
    } else {
        warn!(error = %error, "Upstream transport error");
        TransportError::Other(error.to_string())
    }
}
