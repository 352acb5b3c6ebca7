//! Test doubles shared by unit and integration tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::auth::{CredentialStore, InMemoryCredentialStore};
use crate::domain::config::{BootstrapKey, GatewayConfig, Secret};
use crate::upstream::{
    TransportError, UpstreamClient, UpstreamRequest, UpstreamResponse, UpstreamTransport,
};

/// Transport that replays scripted responses in order and records requests.
///
/// An exhausted script answers with a connect error.
#[derive(Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Result<UpstreamResponse, TransportError>>>,
    requests: Mutex<Vec<UpstreamRequest>>,
    calls: AtomicUsize,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn respond(&self, response: UpstreamResponse) -> &Self {
        self.script.lock().push_back(Ok(response));
        self
    }

    pub fn respond_json(&self, status: u16, body: Value) -> &Self {
        self.respond(UpstreamResponse::json(status, &body))
    }

    pub fn fail(&self, error: TransportError) -> &Self {
        self.script.lock().push_back(Err(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<UpstreamRequest> {
        self.requests.lock().clone()
    }

    pub fn last_request(&self) -> Option<UpstreamRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl UpstreamTransport for MockTransport {
    async fn send(&self, request: UpstreamRequest) -> Result<UpstreamResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Connect("no scripted response".into())))
    }
}

/// Well-known test credentials, one per role.
pub const ADMIN_KEY: &str = "test_admin_key_123";
pub const MANAGER_KEY: &str = "test_manager_key_456";
pub const USER_KEY: &str = "test_user_key_789";

/// Default configuration with one bootstrap key per role.
pub fn test_config() -> GatewayConfig {
    let key = |key: &str, role: &str| BootstrapKey {
        key: Some(Secret::new(key)),
        role: Some(role.to_string()),
    };
    GatewayConfig {
        bootstrap_keys: vec![
            key(ADMIN_KEY, "admin"),
            key(MANAGER_KEY, "ticket_manager"),
            key(USER_KEY, "user"),
        ],
        ..GatewayConfig::default()
    }
}

/// Credential store loaded from the config's bootstrap keys.
pub fn test_store(config: &GatewayConfig) -> Arc<dyn CredentialStore> {
    let store = InMemoryCredentialStore::new();
    store.load_bootstrap(&config.bootstrap_keys);
    Arc::new(store)
}

/// Client over a mock transport using the config's upstream bases.
pub fn mock_client(config: &GatewayConfig, transport: Arc<MockTransport>) -> UpstreamClient {
    UpstreamClient::new(&config.upstream, transport)
}
