//! Gateway error taxonomy.
//!
//! Every request failure maps to one [`GatewayError`] variant with a fixed
//! status and machine code. The response body is always
//! `{"error": <code>, "detail": <message>}`.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Request-path error returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// No credential presented
    #[error("{0}")]
    Unauthenticated(String),

    /// Credential presented but not recognised
    #[error("{0}")]
    InvalidCredential(String),

    /// Role lacks the required permission
    #[error("{0}")]
    Forbidden(String),

    /// Request is well-formed but semantically invalid
    #[error("{0}")]
    BadRequest(String),

    /// Request body exceeds the configured size limit
    #[error("{0}")]
    PayloadTooLarge(String),

    /// Gateway misconfiguration, fails closed
    #[error("{0}")]
    ConfigurationError(String),

    /// Upstream call exceeded the configured timeout
    #[error("{0}")]
    UpstreamTimeout(String),

    /// Upstream could not be reached
    #[error("{0}")]
    UpstreamUnavailable(String),

    /// Upstream connection is not open (startup or shutdown)
    #[error("{0}")]
    ConnectionUnavailable(String),

    /// Upstream answered with an error status
    #[error("{message}")]
    UpstreamError { status: u16, message: String },

    /// Upstream answered successfully with an unexpected body
    #[error("{0}")]
    UpstreamContractViolation(String),

    /// Caller exceeded the route's quota
    #[error("rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}

/// Machine codes, one per variant.
pub mod codes {
    pub const UNAUTHENTICATED: &str = "unauthenticated";
    pub const INVALID_CREDENTIAL: &str = "invalid_credential";
    pub const FORBIDDEN: &str = "forbidden";
    pub const BAD_REQUEST: &str = "bad_request";
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    pub const CONFIGURATION_ERROR: &str = "configuration_error";
    pub const UPSTREAM_TIMEOUT: &str = "upstream_timeout";
    pub const UPSTREAM_UNAVAILABLE: &str = "upstream_unavailable";
    pub const CONNECTION_UNAVAILABLE: &str = "upstream_connection_unavailable";
    pub const UPSTREAM_ERROR: &str = "upstream_error";
    pub const UPSTREAM_CONTRACT_VIOLATION: &str = "upstream_contract_violation";
    pub const RATE_LIMITED: &str = "rate_limited";
}

impl GatewayError {
    pub fn unauthenticated() -> Self {
        Self::Unauthenticated("Missing API key in X-API-Key header".into())
    }

    pub fn invalid_credential() -> Self {
        Self::InvalidCredential("Invalid API key".into())
    }

    pub fn forbidden(permission: &str) -> Self {
        Self::Forbidden(format!(
            "Insufficient permissions. Requires permission: '{permission}'"
        ))
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::BadRequest(detail.into())
    }

    pub fn contract_violation(detail: impl Into<String>) -> Self {
        Self::UpstreamContractViolation(detail.into())
    }

    /// HTTP status for the variant.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthenticated(_) | Self::InvalidCredential(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            Self::UpstreamUnavailable(_) | Self::ConnectionUnavailable(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::UpstreamError { status, .. } => match StatusCode::from_u16(*status) {
                Ok(code) if (400..=599).contains(status) => code,
                _ => StatusCode::BAD_GATEWAY,
            },
            Self::UpstreamContractViolation(_) => StatusCode::BAD_GATEWAY,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Machine-readable code for the variant.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthenticated(_) => codes::UNAUTHENTICATED,
            Self::InvalidCredential(_) => codes::INVALID_CREDENTIAL,
            Self::Forbidden(_) => codes::FORBIDDEN,
            Self::BadRequest(_) => codes::BAD_REQUEST,
            Self::PayloadTooLarge(_) => codes::PAYLOAD_TOO_LARGE,
            Self::ConfigurationError(_) => codes::CONFIGURATION_ERROR,
            Self::UpstreamTimeout(_) => codes::UPSTREAM_TIMEOUT,
            Self::UpstreamUnavailable(_) => codes::UPSTREAM_UNAVAILABLE,
            Self::ConnectionUnavailable(_) => codes::CONNECTION_UNAVAILABLE,
            Self::UpstreamError { .. } => codes::UPSTREAM_ERROR,
            Self::UpstreamContractViolation(_) => codes::UPSTREAM_CONTRACT_VIOLATION,
            Self::RateLimited { .. } => codes::RATE_LIMITED,
        }
    }

    /// Serializable body.
    pub fn body(&self) -> ErrorBody {
        ErrorBody {
            error: self.code().to_string(),
            detail: self.to_string(),
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.body())).into_response();
        if let Self::RateLimited { retry_after_secs } = self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(retry_after_secs.max(1)),
            );
        }
        response
    }
}

/// Wire shape of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub detail: String,
}

/// Result type for request handling
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Service lifecycle errors (not returned to callers)
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] crate::domain::config::ConfigError),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Upstream client could not be built
    #[error("upstream client error: {0}")]
    Upstream(String),

    /// Server stopped with an error
    #[error("server error: {0}")]
    Serve(String),

    /// Service already started or stopped
    #[error("invalid lifecycle transition: {0}")]
    Lifecycle(&'static str),
}
