//! Public request and response shapes.
//!
//! These are the gateway's stable schema. Upstream shapes live with their
//! translators.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::roles::Role;

// =============================================================================
// Service
// =============================================================================

/// Liveness response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Smoke-test response for an authenticated caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecureResponse {
    pub message: String,
    pub role: Role,
}

/// Result of an authenticated round trip to the inventory API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResponse {
    pub message: String,
    /// Inventory domain listing, passed through as returned
    pub domains: Value,
}

/// Body returned when upstream enqueued work asynchronously.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedResponse {
    pub status: String,
    pub message: String,
}

impl AcceptedResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: "accepted".to_string(),
            message: message.into(),
        }
    }
}

// =============================================================================
// Tickets
// =============================================================================

/// Ticket creation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketCreateRequest {
    /// Workflow the ticket is opened under, checked against the workflow table
    pub workflow_name: String,
    pub subject: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub requester: Option<String>,
    /// Extra upstream ticket fields, merged into the ticket object
    #[serde(default)]
    pub details: Option<Map<String, Value>>,
}

/// Partial ticket update. At least one field must be set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketUpdateRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
}

impl TicketUpdateRequest {
    pub fn is_empty(&self) -> bool {
        self.subject.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.priority.is_none()
    }
}

/// Flattened ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketResponse {
    pub id: u64,
    pub subject: String,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub requester: Option<String>,
    pub workflow_name: Option<String>,
    pub current_step: Option<String>,
    pub description: Option<String>,
}

/// Ticket list filters and paging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TicketListQuery {
    pub status: Option<String>,
    pub workflow: Option<String>,
    pub requester: Option<String>,
    pub subject: Option<String>,
    /// Page size, 1..=1000
    pub limit: Option<u32>,
    /// Zero-based start index
    pub offset: Option<u32>,
}

/// One page of tickets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketListResponse {
    pub tickets: Vec<TicketResponse>,
    pub total: u64,
    pub limit: u32,
    pub offset: u32,
    /// Upstream link to the next page, verbatim
    pub next: Option<String>,
    /// Upstream link to the previous page, verbatim
    pub previous: Option<String>,
}

// =============================================================================
// Devices
// =============================================================================

/// Public device shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceResponse {
    pub id: String,
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub model: Option<String>,
    pub version: Option<String>,
    pub ip_address: Option<String>,
    pub domain: Option<String>,
    pub status: Option<String>,
}

/// Device list filters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceListQuery {
    pub status: Option<String>,
    pub name: Option<String>,
    pub vendor: Option<String>,
}

/// Device list with upstream counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceListResponse {
    pub devices: Vec<DeviceResponse>,
    /// Devices in this response
    pub count: u64,
    /// Devices upstream reports in total
    pub total: u64,
}

/// Bulk device registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkDevicesRequest {
    /// Upstream device definitions, forwarded as-is
    pub devices: Vec<Map<String, Value>>,
}

/// Bulk import of managed devices under parent management devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceImportRequest {
    pub devices: Vec<DeviceImportEntry>,
}

/// Import instructions for one parent device.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceImportEntry {
    /// Upstream id of the parent management device
    pub device_id: String,
    /// Import every child the parent manages
    #[serde(default)]
    pub import_all: bool,
    /// Named children to import when `import_all` is false
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub collect_rule_usage_traffic: Option<bool>,
    #[serde(default)]
    pub collect_object_usage_traffic: Option<bool>,
    #[serde(default)]
    pub enable_topology: Option<bool>,
    /// Vendor-specific import structure, forwarded verbatim
    #[serde(default)]
    pub vendor_payload: Option<Map<String, Value>>,
}

// =============================================================================
// Topology
// =============================================================================

/// Path query parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopologyPathQuery {
    pub src: String,
    pub dst: String,
    pub service: String,
}

/// Summarised path query result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologyPathResponse {
    pub traffic_allowed: bool,
    pub is_fully_routed: bool,
    /// Present only when traffic is allowed and fully routed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_device_names: Option<Vec<String>>,
}

// =============================================================================
// Rules
// =============================================================================

/// GraphQL rule search request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleQueryRequest {
    /// TQL filter expression
    pub tql_filter: String,
}

/// Public rule shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleResponse {
    pub id: String,
    pub name: Option<String>,
    pub action: Option<String>,
    pub disabled: bool,
    pub device_name: Option<String>,
    pub sources: Vec<String>,
    pub destinations: Vec<String>,
    pub services: Vec<String>,
}

/// Rule search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleQueryResponse {
    pub rules: Vec<RuleResponse>,
    pub count: u64,
}
