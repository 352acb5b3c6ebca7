//! Running-gateway fixture shared by the flow tests.

mod flows;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use fwgate_gateway::testing::{self, MockTransport};
use fwgate_gateway::{GatewayConfig, GatewayService};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Gateway serving on an ephemeral port until dropped or stopped.
pub struct RunningGateway {
    pub addr: SocketAddr,
    pub transport: Arc<MockTransport>,
    pub client: reqwest::Client,
    shutdown: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<()>>,
}

impl RunningGateway {
    pub async fn start() -> Self {
        Self::start_with(testing::test_config()).await
    }

    pub async fn start_with(config: GatewayConfig) -> Self {
        let transport = MockTransport::new();
        let service = GatewayService::new(config, transport.clone()).unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let server = tokio::spawn(async move {
            service
                .serve(listener, async move {
                    let _ = rx.await;
                })
                .await
                .unwrap();
        });

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        let gateway = Self {
            addr,
            transport,
            client,
            shutdown: Some(tx),
            server: Some(server),
        };
        gateway.wait_ready().await;
        gateway
    }

    async fn wait_ready(&self) {
        for _ in 0..100 {
            if let Ok(response) = self.client.get(self.url("/health")).send().await {
                if response.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("gateway did not become ready on {}", self.addr);
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Request pre-loaded with `key` in the API key header.
    pub fn with_key(
        &self,
        method: reqwest::Method,
        path: &str,
        key: &str,
    ) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.url(path))
            .header(fwgate_gateway::auth::API_KEY_HEADER, key)
    }

    /// Trigger graceful shutdown and wait for the server task to finish.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(server) = self.server.take() {
            server.await.unwrap();
        }
    }
}

impl Drop for RunningGateway {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
