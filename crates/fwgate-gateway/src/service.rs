//! Gateway service - wires the credential store, access control, rate limiter
//! and upstream connection together and runs the HTTP server.

use crate::auth::{AccessControl, CredentialStore, InMemoryCredentialStore};
use crate::domain::config::GatewayConfig;
use crate::domain::error::ServiceError;
use crate::http::{build_router, AppState};
use crate::middleware::{cleanup_task, RateLimitState};
use crate::upstream::{HttpTransport, UpstreamClient, UpstreamConnection, UpstreamTransport};
use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Gateway service state
pub struct GatewayService {
    config: Arc<GatewayConfig>,
    store: Arc<dyn CredentialStore>,
    access: AccessControl,
    rate_limit: Arc<RateLimitState>,
    connection: Arc<UpstreamConnection>,
    transport: Arc<dyn UpstreamTransport>,
}

impl GatewayService {
    /// Validate `config` and build every component. Nothing is bound or
    /// opened until [`start`](Self::start).
    pub fn new(
        config: GatewayConfig,
        transport: Arc<dyn UpstreamTransport>,
    ) -> Result<Self, ServiceError> {
        config.validate()?;

        let store = InMemoryCredentialStore::new();
        let loaded = store.load_bootstrap(&config.bootstrap_keys);
        if loaded == 0 {
            info!("No bootstrap API keys loaded, every gated request will be rejected");
        }
        let store: Arc<dyn CredentialStore> = Arc::new(store);

        let access = AccessControl::new(
            Arc::clone(&store),
            config.permissions.clone(),
            config.workflows.clone(),
        );
        let rate_limit = Arc::new(RateLimitState::new(config.rate_limit.clone()));

        Ok(Self {
            config: Arc::new(config),
            store,
            access,
            rate_limit,
            connection: Arc::new(UpstreamConnection::new()),
            transport,
        })
    }

    /// Service over the real HTTP transport built from `config.upstream`.
    pub fn from_config(config: GatewayConfig) -> Result<Self, ServiceError> {
        let transport = HttpTransport::new(&config.upstream)
            .map_err(|e| ServiceError::Upstream(e.to_string()))?;
        Self::new(config, Arc::new(transport))
    }

    /// Credential store, for runtime key management.
    pub fn credential_store(&self) -> Arc<dyn CredentialStore> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Router over the service's components.
    pub fn router(&self) -> Router {
        let state = AppState::new(self.access.clone(), Arc::clone(&self.connection));
        build_router(state, &self.config, Arc::clone(&self.rate_limit))
    }

    /// Bind the configured address and serve until `shutdown` resolves.
    pub async fn start<F>(&self, shutdown: F) -> Result<(), ServiceError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.http_addr())
            .await
            .map_err(|e| ServiceError::Bind(e.to_string()))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    ///
    /// Opens the upstream connection first and closes it once the server has
    /// drained in-flight requests.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<(), ServiceError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener
            .local_addr()
            .map_err(|e| ServiceError::Bind(e.to_string()))?;

        self.connection.open_with(UpstreamClient::new(
            &self.config.upstream,
            Arc::clone(&self.transport),
        ))?;
        let cleanup = tokio::spawn(cleanup_task(
            Arc::clone(&self.rate_limit),
            self.config.rate_limit.cleanup_interval,
            self.config.rate_limit.bucket_max_age,
        ));

        info!(addr = %addr, "Gateway listening");
        let result = axum::serve(
            listener,
            self.router()
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("Received shutdown signal");
        })
        .await;

        cleanup.abort();
        self.connection.close();

        match result {
            Ok(()) => {
                info!("Gateway stopped");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "HTTP server error");
                Err(ServiceError::Serve(e.to_string()))
            }
        }
    }
}
