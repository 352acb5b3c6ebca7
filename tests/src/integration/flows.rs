//! # Gateway Request Flows
//!
//! Each test drives a running gateway over TCP the way a caller would and
//! checks both the response and what (if anything) reached upstream.

use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

use fwgate_gateway::domain::{Role, Secret};
use fwgate_gateway::testing::{self, ADMIN_KEY, MANAGER_KEY, USER_KEY};
use fwgate_gateway::upstream::{TransportError, UpstreamResponse};

use super::RunningGateway;

// =============================================================================
// TICKETS
// =============================================================================

#[tokio::test]
async fn test_admin_creates_ticket() {
    let gw = RunningGateway::start().await;
    gw.transport.respond_json(
        201,
        json!({ "ticket": {
            "id": 7,
            "subject": "Allow web traffic",
            "status": "In Progress",
            "workflow": { "name": "Example Firewall Workflow" }
        }}),
    );

    let response = gw
        .with_key(Method::POST, "/api/v1/tickets", ADMIN_KEY)
        .json(&json!({
            "workflow_name": "Example Firewall Workflow",
            "subject": "Allow web traffic",
            "priority": "High"
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(response.headers().contains_key("x-request-id"));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["id"], 7);
    assert_eq!(body["subject"], "Allow web traffic");

    let sent = gw.transport.last_request().unwrap();
    assert!(sent.url.ends_with("/securechangeworkflow/api/securechange/tickets"));
    assert_eq!(gw.transport.calls(), 1);
    gw.stop().await;
}

#[tokio::test]
async fn test_unconfigured_workflow_never_reaches_upstream() {
    let gw = RunningGateway::start().await;

    let response = gw
        .with_key(Method::POST, "/api/v1/tickets", ADMIN_KEY)
        .json(&json!({ "workflow_name": "NotConfigured", "subject": "x" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "bad_request");
    assert_eq!(gw.transport.calls(), 0);
    gw.stop().await;
}

#[tokio::test]
async fn test_ticket_creation_is_role_gated() {
    let gw = RunningGateway::start().await;
    let payload = json!({ "workflow_name": "Example Decom Workflow", "subject": "retire fw" });

    let denied = gw
        .with_key(Method::POST, "/api/v1/tickets", USER_KEY)
        .json(&payload)
        .send()
        .await
        .unwrap();
    // Users may not create tickets at all, regardless of workflow.
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    gw.transport.respond_json(
        201,
        json!({ "ticket": { "id": 8, "subject": "retire fw", "status": "New" }}),
    );
    let allowed = gw
        .with_key(Method::POST, "/api/v1/tickets", MANAGER_KEY)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::CREATED);
    assert_eq!(gw.transport.calls(), 1);
    gw.stop().await;
}

// =============================================================================
// DEVICES
// =============================================================================

#[tokio::test]
async fn test_device_listing() {
    let gw = RunningGateway::start().await;
    gw.transport.respond_json(
        200,
        json!({ "device": [{ "id": "dev1", "name": "edge-fw" }], "count": 1, "total": 1 }),
    );

    let response = gw
        .with_key(Method::GET, "/api/v1/devices", USER_KEY)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["devices"][0]["id"], "dev1");
    assert_eq!(body["total"], 1);
    gw.stop().await;
}

#[tokio::test]
async fn test_bulk_add_requires_admin() {
    let gw = RunningGateway::start().await;
    let payload = json!({ "devices": [{ "name": "fw-a", "ip": "10.0.0.1" }] });

    let denied = gw
        .with_key(Method::POST, "/api/v1/devices/bulk", MANAGER_KEY)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
    assert_eq!(gw.transport.calls(), 0);

    gw.transport.respond_json(202, json!({}));
    let accepted = gw
        .with_key(Method::POST, "/api/v1/devices/bulk", ADMIN_KEY)
        .json(&payload)
        .send()
        .await
        .unwrap();
    assert_eq!(accepted.status(), StatusCode::ACCEPTED);
    let body: Value = accepted.json().await.unwrap();
    assert_eq!(body["status"], "accepted");
    assert_eq!(gw.transport.calls(), 1);
    gw.stop().await;
}

// =============================================================================
// FAILURE SURFACES
// =============================================================================

#[tokio::test]
async fn test_upstream_timeout_is_opaque() {
    let mut config = testing::test_config();
    config.upstream.username = "svc-fwgate".into();
    config.upstream.password = Secret::new("upstream-pass-991");
    let gw = RunningGateway::start_with(config).await;
    gw.transport.fail(TransportError::Timeout);

    let response = gw
        .with_key(Method::GET, "/api/v1/devices", USER_KEY)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "upstream_timeout");
    let detail = body["detail"].as_str().unwrap();
    assert!(!detail.contains("securetrack.invalid"));
    assert!(!detail.contains("svc-fwgate"));
    assert!(!detail.contains("upstream-pass-991"));
    gw.stop().await;
}

#[tokio::test]
async fn test_role_removed_from_permission_is_forbidden() {
    let mut config = testing::test_config();
    config.permissions.insert(
        "get_topology_path_image",
        [Role::Admin, Role::TicketManager],
    );
    let gw = RunningGateway::start_with(config).await;

    let response = gw
        .with_key(
            Method::GET,
            "/api/v1/topology/path/image?src=10.0.0.1&dst=10.0.0.2&service=any",
            USER_KEY,
        )
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(gw.transport.calls(), 0);
    gw.stop().await;
}

#[tokio::test]
async fn test_topology_image_streams_bytes() {
    let gw = RunningGateway::start().await;
    gw.transport.respond(UpstreamResponse {
        status: 200,
        content_type: Some("image/png".into()),
        body: bytes::Bytes::from_static(b"\x89PNG\r\n"),
    });

    let response = gw
        .with_key(
            Method::GET,
            "/api/v1/topology/path/image?src=10.0.0.1&dst=10.0.0.2&service=tcp:443",
            USER_KEY,
        )
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["content-type"], "image/png");
    assert_eq!(&response.bytes().await.unwrap()[..], b"\x89PNG\r\n");
    gw.stop().await;
}

#[tokio::test]
async fn test_missing_key_is_unauthorized() {
    let gw = RunningGateway::start().await;

    let response = gw
        .client
        .get(gw.url("/api/v1/tickets"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(gw.transport.calls(), 0);
    gw.stop().await;
}

#[tokio::test]
async fn test_rate_limit_over_tcp() {
    let mut config = testing::test_config();
    config.rate_limit.overrides.insert("access_secure_endpoint".into(), 2);
    let gw = RunningGateway::start_with(config).await;

    for _ in 0..2 {
        let ok = gw
            .with_key(Method::GET, "/secure", USER_KEY)
            .send()
            .await
            .unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
    }
    let limited = gw
        .with_key(Method::GET, "/secure", USER_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(limited.headers().contains_key("retry-after"));
    gw.stop().await;
}
