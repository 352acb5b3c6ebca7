//! Operation identifiers and the static route table.
//!
//! Every protected route names exactly one operation. The router, the rate
//! limiter and configuration validation all read [`ROUTES`], so a route can
//! never exist without a permission identifier and a quota.

use std::fmt;

use axum::http::Method;

/// Public paths shared by the router and the route table.
pub mod paths {
    pub const HEALTH: &str = "/health";
    pub const SECURE: &str = "/secure";
    pub const CONNECTION_TEST: &str = "/connection-test";
    pub const TICKETS: &str = "/api/v1/tickets";
    pub const TICKET: &str = "/api/v1/tickets/:id";
    pub const DEVICES: &str = "/api/v1/devices";
    pub const DEVICE: &str = "/api/v1/devices/:id";
    pub const DEVICES_BULK: &str = "/api/v1/devices/bulk";
    pub const DEVICES_BULK_IMPORT: &str = "/api/v1/devices/bulk/import";
    pub const TOPOLOGY_PATH: &str = "/api/v1/topology/path";
    pub const TOPOLOGY_PATH_IMAGE: &str = "/api/v1/topology/path/image";
    pub const GRAPHQL_RULES: &str = "/api/v1/graphql/rules";
}

/// Permission-gated gateway operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    AccessSecureEndpoint,
    TestUpstreamConnection,
    ListTickets,
    CreateTicket,
    GetTicket,
    UpdateTicket,
    ListDevices,
    GetDevice,
    AddDevices,
    ImportManagedDevices,
    GetTopologyPath,
    GetTopologyPathImage,
    QueryRulesGraphql,
}

impl Operation {
    /// Every operation.
    pub const ALL: [Operation; 13] = [
        Operation::AccessSecureEndpoint,
        Operation::TestUpstreamConnection,
        Operation::ListTickets,
        Operation::CreateTicket,
        Operation::GetTicket,
        Operation::UpdateTicket,
        Operation::ListDevices,
        Operation::GetDevice,
        Operation::AddDevices,
        Operation::ImportManagedDevices,
        Operation::GetTopologyPath,
        Operation::GetTopologyPathImage,
        Operation::QueryRulesGraphql,
    ];

    /// Permission identifier used in the permission table.
    pub const fn id(&self) -> &'static str {
        match self {
            Operation::AccessSecureEndpoint => "access_secure_endpoint",
            Operation::TestUpstreamConnection => "test_upstream_connection",
            Operation::ListTickets => "list_tickets",
            Operation::CreateTicket => "create_ticket",
            Operation::GetTicket => "get_ticket",
            Operation::UpdateTicket => "update_ticket",
            Operation::ListDevices => "list_devices",
            Operation::GetDevice => "get_device",
            Operation::AddDevices => "add_devices",
            Operation::ImportManagedDevices => "import_managed_devices",
            Operation::GetTopologyPath => "get_topology_path",
            Operation::GetTopologyPathImage => "get_topology_path_image",
            Operation::QueryRulesGraphql => "query_rules_graphql",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// HTTP verbs used by the public API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    Get,
    Post,
    Put,
}

impl HttpVerb {
    /// Parse an `http` method, `None` for verbs the API never routes.
    pub fn from_method(method: &Method) -> Option<HttpVerb> {
        match *method {
            Method::GET => Some(HttpVerb::Get),
            Method::POST => Some(HttpVerb::Post),
            Method::PUT => Some(HttpVerb::Put),
            _ => None,
        }
    }
}

/// Route metadata.
#[derive(Debug, Clone, Copy)]
pub struct RouteInfo {
    /// HTTP verb
    pub verb: HttpVerb,
    /// Router path pattern
    pub path: &'static str,
    /// Gated operation, `None` for open routes
    pub operation: Option<Operation>,
    /// Default per-minute quota, `None` when exempt from rate limiting
    pub per_minute: Option<u32>,
}

impl RouteInfo {
    const fn open(verb: HttpVerb, path: &'static str) -> Self {
        Self {
            verb,
            path,
            operation: None,
            per_minute: None,
        }
    }

    const fn gated(verb: HttpVerb, path: &'static str, op: Operation, per_minute: u32) -> Self {
        Self {
            verb,
            path,
            operation: Some(op),
            per_minute: Some(per_minute),
        }
    }

    /// Key under which the route's quota is configured and tracked.
    pub fn limit_key(&self) -> &'static str {
        match self.operation {
            Some(op) => op.id(),
            None => self.path,
        }
    }
}

/// Every route served by the gateway.
pub static ROUTES: [RouteInfo; 14] = [
    RouteInfo::open(HttpVerb::Get, paths::HEALTH),
    RouteInfo::gated(
        HttpVerb::Get,
        paths::SECURE,
        Operation::AccessSecureEndpoint,
        60,
    ),
    RouteInfo::gated(
        HttpVerb::Get,
        paths::CONNECTION_TEST,
        Operation::TestUpstreamConnection,
        10,
    ),
    // --- Tickets ---
    RouteInfo::gated(HttpVerb::Get, paths::TICKETS, Operation::ListTickets, 100),
    RouteInfo::gated(HttpVerb::Post, paths::TICKETS, Operation::CreateTicket, 30),
    RouteInfo::gated(HttpVerb::Get, paths::TICKET, Operation::GetTicket, 100),
    RouteInfo::gated(HttpVerb::Put, paths::TICKET, Operation::UpdateTicket, 30),
    // --- Devices ---
    RouteInfo::gated(HttpVerb::Get, paths::DEVICES, Operation::ListDevices, 100),
    RouteInfo::gated(HttpVerb::Get, paths::DEVICE, Operation::GetDevice, 100),
    RouteInfo::gated(HttpVerb::Post, paths::DEVICES_BULK, Operation::AddDevices, 10),
    RouteInfo::gated(
        HttpVerb::Post,
        paths::DEVICES_BULK_IMPORT,
        Operation::ImportManagedDevices,
        10,
    ),
    // --- Topology ---
    RouteInfo::gated(
        HttpVerb::Get,
        paths::TOPOLOGY_PATH,
        Operation::GetTopologyPath,
        20,
    ),
    RouteInfo::gated(
        HttpVerb::Get,
        paths::TOPOLOGY_PATH_IMAGE,
        Operation::GetTopologyPathImage,
        20,
    ),
    // --- GraphQL ---
    RouteInfo::gated(
        HttpVerb::Post,
        paths::GRAPHQL_RULES,
        Operation::QueryRulesGraphql,
        30,
    ),
];

/// Find the route registered for a verb and router path pattern.
pub fn find_route(method: &Method, path: &str) -> Option<&'static RouteInfo> {
    let verb = HttpVerb::from_method(method)?;
    ROUTES
        .iter()
        .find(|route| route.verb == verb && route.path == path)
}

/// Route that serves an operation.
pub fn route_for(op: Operation) -> Option<&'static RouteInfo> {
    ROUTES.iter().find(|route| route.operation == Some(op))
}

/// Operations referenced by at least one route.
pub fn routed_operations() -> impl Iterator<Item = Operation> {
    ROUTES.iter().filter_map(|route| route.operation)
}
