//! Caller authentication from the `X-API-Key` header.

use axum::http::HeaderMap;
use fwgate_telemetry::key_prefix;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::store::CredentialStore;
use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::roles::Role;

/// Header carrying the caller's API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Presented API key. Never printed whole.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Truncated form for logs.
    pub fn prefix(&self) -> String {
        key_prefix(&self.0)
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({})", self.prefix())
    }
}

/// Verified caller for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub api_key: ApiKey,
    pub role: Role,
}

/// Resolves the caller's identity against a credential store.
#[derive(Clone)]
pub struct Authenticator {
    store: Arc<dyn CredentialStore>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// Authenticate the request's credential header.
    ///
    /// Missing or empty header is `Unauthenticated`; a key the store does not
    /// recognise is `InvalidCredential`.
    pub fn authenticate(&self, headers: &HeaderMap) -> GatewayResult<Identity> {
        let Some(raw) = headers.get(API_KEY_HEADER) else {
            warn!("Request without API key");
            return Err(GatewayError::unauthenticated());
        };
        if raw.is_empty() {
            warn!("Request with empty API key");
            return Err(GatewayError::unauthenticated());
        }

        let Ok(key) = raw.to_str() else {
            warn!("API key header is not visible ASCII");
            return Err(GatewayError::invalid_credential());
        };
        let api_key = ApiKey::new(key);

        match self.store.verify(api_key.expose()) {
            Some(role) => {
                info!(key_prefix = %api_key.prefix(), role = %role, "API key validated");
                Ok(Identity { api_key, role })
            }
            None => {
                warn!(key_prefix = %api_key.prefix(), "Invalid API key");
                Err(GatewayError::invalid_credential())
            }
        }
    }
}
