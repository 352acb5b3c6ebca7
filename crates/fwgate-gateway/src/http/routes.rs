//! Route handlers and router assembly.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::fmt;
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, info};

use super::state::AppState;
use crate::domain::config::GatewayConfig;
use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::operations::{paths, Operation};
use crate::domain::types::{
    AcceptedResponse, BulkDevicesRequest, ConnectionTestResponse, DeviceImportRequest, DeviceListQuery,
    DeviceListResponse, DeviceResponse, HealthResponse, RuleQueryRequest, RuleQueryResponse,
    SecureResponse, TicketCreateRequest, TicketListQuery, TicketListResponse, TicketResponse,
    TicketUpdateRequest, TopologyPathQuery, TopologyPathResponse,
};
use crate::middleware::{create_cors_layer, RateLimitLayer, RateLimitState, RequestContextLayer};

/// Assemble the REST router.
///
/// Each `layer` call wraps every route separately, so the rate limiter sees
/// the matched route pattern.
pub fn build_router(state: AppState, config: &GatewayConfig, rate_limit: Arc<RateLimitState>) -> Router {
    Router::new()
        .route(paths::HEALTH, get(health))
        .route(paths::SECURE, get(secure))
        .route(paths::CONNECTION_TEST, get(connection_test))
        // --- Tickets ---
        .route(paths::TICKETS, get(list_tickets).post(create_ticket))
        .route(paths::TICKET, get(get_ticket).put(update_ticket))
        // --- Devices ---
        .route(paths::DEVICES, get(list_devices))
        .route(paths::DEVICE, get(get_device))
        .route(paths::DEVICES_BULK, post(add_devices))
        .route(paths::DEVICES_BULK_IMPORT, post(import_managed_devices))
        // --- Topology ---
        .route(paths::TOPOLOGY_PATH, get(topology_path))
        .route(paths::TOPOLOGY_PATH_IMAGE, get(topology_path_image))
        // --- GraphQL ---
        .route(paths::GRAPHQL_RULES, post(query_rules))
        .layer(RequestBodyLimitLayer::new(config.limits.max_request_size))
        .layer(RateLimitLayer::with_state(rate_limit))
        .layer(create_cors_layer(&config.cors))
        .layer(RequestContextLayer::new())
        .with_state(state)
}

/// Extractor rejections surface as `BadRequest` in the gateway's error shape.
fn invalid(what: &str, rejection: impl fmt::Display) -> GatewayError {
    debug!(input = what, error = %rejection, "Rejected request input");
    GatewayError::bad_request(format!("Invalid {what}: {rejection}"))
}

/// Body rejections, keeping the size limit distinct from malformed JSON.
fn invalid_body(rejection: JsonRejection) -> GatewayError {
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        debug!("Rejected oversized request body");
        return GatewayError::PayloadTooLarge("Request body too large".into());
    }
    invalid("body", rejection)
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn secure(State(state): State<AppState>, headers: HeaderMap) -> GatewayResult<Json<SecureResponse>> {
    let identity = state.access.check(&headers, Operation::AccessSecureEndpoint)?;
    Ok(Json(SecureResponse {
        message: "You have accessed the secure endpoint!".to_string(),
        role: identity.role,
    }))
}

async fn connection_test(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> GatewayResult<Json<ConnectionTestResponse>> {
    state.access.check(&headers, Operation::TestUpstreamConnection)?;
    let domains = state.upstream.client()?.domains().await?;
    Ok(Json(ConnectionTestResponse {
        message: "Successfully connected to upstream inventory API".to_string(),
        domains,
    }))
}

// =============================================================================
// Tickets
// =============================================================================

async fn list_tickets(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<TicketListQuery>, QueryRejection>,
) -> GatewayResult<Json<TicketListResponse>> {
    state.access.check(&headers, Operation::ListTickets)?;
    let Query(query) = query.map_err(|e| invalid("query", e))?;
    let tickets = state.upstream.client()?.list_tickets(&query).await?;
    Ok(Json(tickets))
}

async fn create_ticket(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<TicketCreateRequest>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<TicketResponse>)> {
    let identity = state.access.check(&headers, Operation::CreateTicket)?;
    let Json(request) = payload.map_err(invalid_body)?;
    state
        .access
        .authorize_workflow(&identity, &request.workflow_name)?;

    info!(
        workflow = %request.workflow_name,
        role = %identity.role,
        "Creating ticket"
    );
    let ticket = state.upstream.client()?.create_ticket(&request).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

async fn get_ticket(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<u64>, PathRejection>,
) -> GatewayResult<Json<TicketResponse>> {
    state.access.check(&headers, Operation::GetTicket)?;
    let Path(id) = id.map_err(|e| invalid("ticket id", e))?;
    let ticket = state.upstream.client()?.get_ticket(id).await?;
    Ok(Json(ticket))
}

async fn update_ticket(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<TicketUpdateRequest>, JsonRejection>,
) -> GatewayResult<Json<TicketResponse>> {
    state.access.check(&headers, Operation::UpdateTicket)?;
    let Path(id) = id.map_err(|e| invalid("ticket id", e))?;
    let Json(request) = payload.map_err(invalid_body)?;
    let ticket = state.upstream.client()?.update_ticket(id, &request).await?;
    Ok(Json(ticket))
}

// =============================================================================
// Devices
// =============================================================================

async fn list_devices(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<DeviceListQuery>, QueryRejection>,
) -> GatewayResult<Json<DeviceListResponse>> {
    state.access.check(&headers, Operation::ListDevices)?;
    let Query(query) = query.map_err(|e| invalid("query", e))?;
    let devices = state.upstream.client()?.list_devices(&query).await?;
    Ok(Json(devices))
}

async fn get_device(
    State(state): State<AppState>,
    headers: HeaderMap,
    id: Result<Path<String>, PathRejection>,
) -> GatewayResult<Json<DeviceResponse>> {
    state.access.check(&headers, Operation::GetDevice)?;
    let Path(id) = id.map_err(|e| invalid("device id", e))?;
    let device = state.upstream.client()?.get_device(&id).await?;
    Ok(Json(device))
}

async fn add_devices(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<BulkDevicesRequest>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<AcceptedResponse>)> {
    state.access.check(&headers, Operation::AddDevices)?;
    let Json(request) = payload.map_err(invalid_body)?;
    state.upstream.client()?.add_devices(&request).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse::new(format!(
            "{} device(s) submitted for registration",
            request.devices.len()
        ))),
    ))
}

async fn import_managed_devices(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<DeviceImportRequest>, JsonRejection>,
) -> GatewayResult<(StatusCode, Json<AcceptedResponse>)> {
    state.access.check(&headers, Operation::ImportManagedDevices)?;
    let Json(request) = payload.map_err(invalid_body)?;
    state
        .upstream
        .client()?
        .import_managed_devices(&request)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(AcceptedResponse::new(format!(
            "Import submitted for {} management device(s)",
            request.devices.len()
        ))),
    ))
}

// =============================================================================
// Topology
// =============================================================================

async fn topology_path(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<TopologyPathQuery>, QueryRejection>,
) -> GatewayResult<Json<TopologyPathResponse>> {
    state.access.check(&headers, Operation::GetTopologyPath)?;
    let Query(query) = query.map_err(|e| invalid("query", e))?;
    let path = state.upstream.client()?.topology_path(&query).await?;
    Ok(Json(path))
}

async fn topology_path_image(
    State(state): State<AppState>,
    headers: HeaderMap,
    query: Result<Query<TopologyPathQuery>, QueryRejection>,
) -> GatewayResult<Response> {
    state.access.check(&headers, Operation::GetTopologyPathImage)?;
    let Query(query) = query.map_err(|e| invalid("query", e))?;
    let image = state.upstream.client()?.topology_path_image(&query).await?;

    let content_type = HeaderValue::from_str(&image.content_type)
        .unwrap_or(HeaderValue::from_static("image/png"));
    Ok(([(header::CONTENT_TYPE, content_type)], image.bytes).into_response())
}

// =============================================================================
// Rules
// =============================================================================

async fn query_rules(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<RuleQueryRequest>, JsonRejection>,
) -> GatewayResult<Json<RuleQueryResponse>> {
    state.access.check(&headers, Operation::QueryRulesGraphql)?;
    let Json(request) = payload.map_err(invalid_body)?;
    let rules = state.upstream.client()?.query_rules(&request.tql_filter).await?;
    Ok(Json(rules))
}
