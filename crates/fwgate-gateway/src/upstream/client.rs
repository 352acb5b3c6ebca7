//! Typed upstream client.
//!
//! One method per gateway operation. Each builds the upstream request, sends
//! it through the transport and hands the body to the translators. Failures
//! are mapped to [`GatewayError`] here so handlers only deal with one type.

use bytes::Bytes;
use fwgate_telemetry::masked;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::transport::{Accept, TransportError, UpstreamRequest, UpstreamResponse, UpstreamTransport};
use crate::domain::config::UpstreamConfig;
use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::types::{
    BulkDevicesRequest, DeviceImportRequest, DeviceListQuery, DeviceListResponse, DeviceResponse,
    RuleQueryResponse, TicketCreateRequest, TicketListQuery, TicketListResponse, TicketResponse,
    TicketUpdateRequest, TopologyPathQuery, TopologyPathResponse,
};
use crate::translate::{device, import, rules, ticket, topology};

const DOMAINS_PATH: &str = "/securetrack/api/domains";
const TICKETS_PATH: &str = "/securechangeworkflow/api/securechange/tickets";
const DEVICES_PATH: &str = "/securetrack/api/devices";
const TOPOLOGY_PATH: &str = "/securetrack/api/topology/path";
const TOPOLOGY_IMAGE_PATH: &str = "/securetrack/api/topology/path_image";

/// Longest slice of an upstream error body quoted back to the caller.
const ERROR_EXCERPT_CHARS: usize = 100;

/// Rendered topology image.
#[derive(Debug, Clone)]
pub struct PathImage {
    pub content_type: String,
    pub bytes: Bytes,
}

pub struct UpstreamClient {
    transport: Arc<dyn UpstreamTransport>,
    ticketing: String,
    inventory: String,
    graphql: String,
}

impl UpstreamClient {
    pub fn new(config: &UpstreamConfig, transport: Arc<dyn UpstreamTransport>) -> Self {
        Self {
            transport,
            ticketing: config.ticketing_base().to_string(),
            inventory: config.inventory_base().to_string(),
            graphql: config.graphql_endpoint(),
        }
    }

    // =========================================================================
    // Connectivity
    // =========================================================================

    /// Authenticated round trip to the inventory API. Returns the domain
    /// listing untouched.
    pub async fn domains(&self) -> GatewayResult<Value> {
        let url = format!("{}{DOMAINS_PATH}", self.inventory);
        let body = self.json(UpstreamRequest::get(url)).await?;
        info!("Upstream connection verified");
        Ok(body)
    }

    // =========================================================================
    // Tickets
    // =========================================================================

    pub async fn list_tickets(&self, query: &TicketListQuery) -> GatewayResult<TicketListResponse> {
        let (params, page) = ticket::ticket_filters(query)?;
        let url = format!("{}{TICKETS_PATH}", self.ticketing);
        let body = self.json(UpstreamRequest::get(url).with_query(params)).await?;
        ticket::ticket_list_from_upstream(body, page)
    }

    pub async fn get_ticket(&self, id: u64) -> GatewayResult<TicketResponse> {
        let url = format!("{}{TICKETS_PATH}/{id}", self.ticketing);
        let body = self.json(UpstreamRequest::get(url)).await?;
        ticket::ticket_from_upstream(body)
    }

    pub async fn create_ticket(&self, request: &TicketCreateRequest) -> GatewayResult<TicketResponse> {
        let payload = ticket::create_body(request)?;
        let url = format!("{}{TICKETS_PATH}", self.ticketing);
        let body = self.json(UpstreamRequest::post(url, payload)).await?;
        let created = ticket::ticket_from_upstream(body)?;
        info!(ticket_id = created.id, "Ticket created");
        Ok(created)
    }

    pub async fn update_ticket(
        &self,
        id: u64,
        request: &TicketUpdateRequest,
    ) -> GatewayResult<TicketResponse> {
        let payload = ticket::update_body(request)?;
        let url = format!("{}{TICKETS_PATH}/{id}", self.ticketing);
        let body = self.json(UpstreamRequest::put(url, payload)).await?;
        let updated = ticket::ticket_from_upstream(body)?;
        info!(ticket_id = updated.id, "Ticket updated");
        Ok(updated)
    }

    // =========================================================================
    // Devices
    // =========================================================================

    pub async fn list_devices(&self, query: &DeviceListQuery) -> GatewayResult<DeviceListResponse> {
        let url = format!("{}{DEVICES_PATH}", self.inventory);
        let request = UpstreamRequest::get(url).with_query(device::device_filters(query));
        device::device_list_from_upstream(self.json(request).await?)
    }

    pub async fn get_device(&self, id: &str) -> GatewayResult<DeviceResponse> {
        let id = device_id_segment(id)?;
        let url = format!("{}{DEVICES_PATH}/{id}", self.inventory);
        let body = self.json(UpstreamRequest::get(url)).await?;
        // Upstream wraps a single device as {"device": {...}}
        match body {
            Value::Object(mut fields) if fields.contains_key("device") => {
                device::device_from_upstream(&fields.remove("device").unwrap_or(Value::Null))
            }
            other => device::device_from_upstream(&other),
        }
    }

    /// Register devices. Upstream accepts the batch asynchronously.
    pub async fn add_devices(&self, request: &BulkDevicesRequest) -> GatewayResult<()> {
        let payload = import::bulk_body(request)?;
        let url = format!("{}{DEVICES_PATH}/bulk/", self.inventory);
        self.accepted(UpstreamRequest::post(url, payload)).await?;
        info!(devices = request.devices.len(), "Bulk device registration accepted");
        Ok(())
    }

    /// Import managed devices. Upstream accepts the batch asynchronously.
    pub async fn import_managed_devices(&self, request: &DeviceImportRequest) -> GatewayResult<()> {
        let payload = import::import_body(request)?;
        let url = format!("{}{DEVICES_PATH}/bulk/import", self.inventory);
        self.accepted(UpstreamRequest::post(url, payload)).await?;
        info!(devices = request.devices.len(), "Managed device import accepted");
        Ok(())
    }

    // =========================================================================
    // Topology
    // =========================================================================

    pub async fn topology_path(&self, query: &TopologyPathQuery) -> GatewayResult<TopologyPathResponse> {
        let params = topology::path_params(query)?;
        let url = format!("{}{TOPOLOGY_PATH}", self.inventory);
        topology::path_from_upstream(self.json(UpstreamRequest::get(url).with_query(params)).await?)
    }

    pub async fn topology_path_image(&self, query: &TopologyPathQuery) -> GatewayResult<PathImage> {
        let params = topology::path_params(query)?;
        let url = format!("{}{TOPOLOGY_IMAGE_PATH}", self.inventory);
        let request = UpstreamRequest::get(url)
            .with_query(params)
            .accepting(Accept::Image);
        let response = self.send(request).await?;

        let content_type = response
            .content_type
            .unwrap_or_else(|| "image/png".to_string());
        if !content_type.starts_with("image/") {
            warn!(content_type = %content_type, "Topology image response is not an image");
            return Err(GatewayError::contract_violation(
                "Unexpected upstream topology image response",
            ));
        }
        Ok(PathImage {
            content_type,
            bytes: response.body,
        })
    }

    // =========================================================================
    // Rules
    // =========================================================================

    pub async fn query_rules(&self, tql_filter: &str) -> GatewayResult<RuleQueryResponse> {
        let payload = rules::query_body(tql_filter)?;
        let body = self
            .json(UpstreamRequest::post(self.graphql.clone(), payload))
            .await?;
        rules::rules_from_graphql(body)
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    /// Send and require a 2xx status.
    async fn send(&self, request: UpstreamRequest) -> GatewayResult<UpstreamResponse> {
        let method = request.method.clone();
        if let Some(body) = &request.body {
            debug!(method = %method, body = %masked(body), "Upstream request body");
        }
        let response = self.transport.send(request).await.map_err(transport_error)?;
        debug!(method = %method, status = response.status, "Upstream responded");

        if response.is_success() {
            Ok(response)
        } else {
            Err(status_error(&response))
        }
    }

    /// Send and decode a JSON body.
    async fn json(&self, request: UpstreamRequest) -> GatewayResult<Value> {
        let response = self.send(request).await?;
        serde_json::from_slice(&response.body).map_err(|e| {
            warn!(error = %e, "Upstream returned a non-JSON body");
            GatewayError::contract_violation("Upstream returned an invalid JSON body")
        })
    }

    /// Send where any 2xx means accepted. The body is ignored.
    async fn accepted(&self, request: UpstreamRequest) -> GatewayResult<()> {
        self.send(request).await.map(|_| ())
    }
}

/// Device ids are opaque strings, but must stay a single path segment.
fn device_id_segment(id: &str) -> GatewayResult<&str> {
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
        && id != "."
        && id != "..";
    if valid {
        Ok(id)
    } else {
        Err(GatewayError::bad_request("Invalid device id"))
    }
}

fn transport_error(error: TransportError) -> GatewayError {
    match error {
        TransportError::Timeout => GatewayError::UpstreamTimeout("Upstream request timed out".into()),
        TransportError::Connect(_) | TransportError::Other(_) => {
            GatewayError::UpstreamUnavailable("Could not connect to upstream API".into())
        }
    }
}

/// Map a non-2xx answer, quoting upstream's own message when it has one.
fn status_error(response: &UpstreamResponse) -> GatewayError {
    let quoted = serde_json::from_slice::<Value>(&response.body)
        .ok()
        .and_then(|body| {
            body.get("message")
                .or_else(|| body.pointer("/result/message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| {
            String::from_utf8_lossy(&response.body)
                .chars()
                .take(ERROR_EXCERPT_CHARS)
                .collect()
        });

    warn!(status = response.status, "Upstream returned an error status");
    let message = if quoted.trim().is_empty() {
        format!("Upstream API error: {}", response.status)
    } else {
        format!("Upstream API error: {} - {}", response.status, quoted.trim())
    };
    GatewayError::UpstreamError {
        status: response.status,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use axum::http::Method;
    use serde_json::json;

    fn client(transport: Arc<MockTransport>) -> UpstreamClient {
        let config = UpstreamConfig {
            ticketing_url: "https://sc.example/".into(),
            inventory_url: "https://st.example".into(),
            ..UpstreamConfig::default()
        };
        UpstreamClient::new(&config, transport)
    }

    #[tokio::test]
    async fn test_get_ticket_url_and_translation() {
        let transport = MockTransport::new();
        transport.respond_json(
            200,
            json!({ "ticket": { "id": 42, "subject": "Open 443", "status": "In Progress" } }),
        );
        let ticket = client(transport.clone()).get_ticket(42).await.unwrap();

        assert_eq!(ticket.id, 42);
        let request = transport.last_request().unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(
            request.url,
            "https://sc.example/securechangeworkflow/api/securechange/tickets/42"
        );
    }

    #[tokio::test]
    async fn test_domains_passes_body_through() {
        let transport = MockTransport::new();
        transport.respond_json(200, json!({ "domain": [{ "id": 1, "name": "Default" }] }));
        let domains = client(transport.clone()).domains().await.unwrap();

        assert_eq!(domains["domain"][0]["name"], "Default");
        let request = transport.last_request().unwrap();
        assert_eq!(request.method, Method::GET);
        assert_eq!(request.url, "https://st.example/securetrack/api/domains");
    }

    #[tokio::test]
    async fn test_domains_rejects_non_json() {
        let transport = MockTransport::new();
        transport.respond(UpstreamResponse {
            status: 200,
            content_type: Some("text/html".into()),
            body: Bytes::from_static(b"<html>login</html>"),
        });
        let error = client(transport).domains().await.unwrap_err();
        assert_eq!(error.code(), "upstream_contract_violation");
    }

    #[tokio::test]
    async fn test_list_devices_sends_filters() {
        let transport = MockTransport::new();
        transport.respond_json(
            200,
            json!({ "device": [{ "id": "dev1" }], "count": 1, "total": 1 }),
        );
        let query = DeviceListQuery {
            vendor: Some("Acme".into()),
            ..DeviceListQuery::default()
        };
        let list = client(transport.clone()).list_devices(&query).await.unwrap();

        assert_eq!(list.total, 1);
        let request = transport.last_request().unwrap();
        assert_eq!(request.url, "https://st.example/securetrack/api/devices");
        assert_eq!(request.query, vec![("vendor".to_string(), "Acme".to_string())]);
    }

    #[tokio::test]
    async fn test_get_device_unwraps_envelope() {
        let transport = MockTransport::new();
        transport.respond_json(200, json!({ "device": { "id": "dev1", "OS_Version": "9" } }));
        let device = client(transport).get_device("dev1").await.unwrap();
        assert_eq!(device.version.as_deref(), Some("9"));
    }

    #[tokio::test]
    async fn test_device_id_must_be_one_segment() {
        let transport = MockTransport::new();
        let client = client(transport.clone());
        for id in ["", "..", "a/b", "x?y=1"] {
            assert!(matches!(
                client.get_device(id).await,
                Err(GatewayError::BadRequest(_))
            ));
        }
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_timeout_maps_to_gateway_timeout() {
        let transport = MockTransport::new();
        transport.fail(TransportError::Timeout);
        let error = client(transport)
            .get_ticket(1)
            .await
            .unwrap_err();
        assert_eq!(error.status().as_u16(), 504);
        assert!(!error.to_string().contains("sc.example"));
    }

    #[tokio::test]
    async fn test_connect_failure_maps_to_unavailable() {
        let transport = MockTransport::new();
        transport.fail(TransportError::Connect("tcp connect error".into()));
        let error = client(transport).list_devices(&DeviceListQuery::default()).await.unwrap_err();
        assert_eq!(error.status().as_u16(), 503);
        assert_eq!(error.code(), "upstream_unavailable");
    }

    #[tokio::test]
    async fn test_error_status_quotes_upstream_message() {
        let transport = MockTransport::new();
        transport.respond_json(404, json!({ "result": { "message": "Ticket 9 not found" } }));
        let error = client(transport).get_ticket(9).await.unwrap_err();
        assert_eq!(
            error,
            GatewayError::UpstreamError {
                status: 404,
                message: "Upstream API error: 404 - Ticket 9 not found".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_error_status_truncates_text_body() {
        let transport = MockTransport::new();
        transport.respond(UpstreamResponse {
            status: 500,
            content_type: Some("text/html".into()),
            body: Bytes::from("x".repeat(400)),
        });
        let error = client(transport).get_ticket(1).await.unwrap_err();
        let GatewayError::UpstreamError { status, message } = error else {
            panic!("expected upstream error");
        };
        assert_eq!(status, 500);
        assert_eq!(message.len(), "Upstream API error: 500 - ".len() + ERROR_EXCERPT_CHARS);
    }

    #[tokio::test]
    async fn test_invalid_json_is_contract_violation() {
        let transport = MockTransport::new();
        transport.respond(UpstreamResponse {
            status: 200,
            content_type: Some("text/plain".into()),
            body: Bytes::from_static(b"ok"),
        });
        let error = client(transport).get_ticket(1).await.unwrap_err();
        assert_eq!(error.code(), "upstream_contract_violation");
    }

    #[tokio::test]
    async fn test_bulk_operations_accept_any_success() {
        let transport = MockTransport::new();
        transport.respond(UpstreamResponse {
            status: 202,
            content_type: None,
            body: Bytes::new(),
        });
        let mut device = serde_json::Map::new();
        device.insert("model".into(), json!("fmg"));
        client(transport.clone())
            .add_devices(&BulkDevicesRequest {
                devices: vec![device],
            })
            .await
            .unwrap();
        assert_eq!(
            transport.last_request().unwrap().url,
            "https://st.example/securetrack/api/devices/bulk/"
        );
    }

    #[tokio::test]
    async fn test_bad_request_sends_nothing() {
        let transport = MockTransport::new();
        let client = client(transport.clone());
        assert!(client
            .add_devices(&BulkDevicesRequest { devices: vec![] })
            .await
            .is_err());
        assert!(client.query_rules("  ").await.is_err());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_topology_image() {
        let transport = MockTransport::new();
        transport.respond(UpstreamResponse {
            status: 200,
            content_type: Some("image/png".into()),
            body: Bytes::from_static(&[0x89, b'P', b'N', b'G']),
        });
        let query = TopologyPathQuery {
            src: "10.0.0.1".into(),
            dst: "10.0.0.2".into(),
            service: "any".into(),
        };
        let image = client(transport.clone())
            .topology_path_image(&query)
            .await
            .unwrap();
        assert_eq!(image.content_type, "image/png");
        assert_eq!(image.bytes.len(), 4);

        let request = transport.last_request().unwrap();
        assert_eq!(request.accept, Accept::Image);
        assert!(request.url.ends_with("/securetrack/api/topology/path_image"));
    }

    #[tokio::test]
    async fn test_topology_image_rejects_json() {
        let transport = MockTransport::new();
        transport.respond_json(200, json!({ "status": "ok" }));
        let query = TopologyPathQuery {
            src: "a".into(),
            dst: "b".into(),
            service: "c".into(),
        };
        let error = client(transport).topology_path_image(&query).await.unwrap_err();
        assert_eq!(error.code(), "upstream_contract_violation");
    }

    #[tokio::test]
    async fn test_query_rules_posts_to_default_graphql_endpoint() {
        let transport = MockTransport::new();
        transport.respond_json(200, json!({ "data": { "rules": { "count": 0, "values": [] } } }));
        let result = client(transport.clone())
            .query_rules("action = 'drop'")
            .await
            .unwrap();
        assert_eq!(result.count, 0);

        let request = transport.last_request().unwrap();
        assert_eq!(request.method, Method::POST);
        assert_eq!(request.url, "https://st.example/sg/api/v1/graphql");
        assert_eq!(request.body.unwrap()["variables"]["filter"], "action = 'drop'");
    }
}
