//! Domain types for the gateway.
//!
//! Roles, operations, permission tables, configuration, the error taxonomy
//! and the public request/response shapes.

pub mod config;
pub mod error;
pub mod operations;
pub mod permissions;
pub mod roles;
pub mod types;

// Re-exports for convenience
pub use config::{ConfigError, GatewayConfig, Secret};
pub use error::{ErrorBody, GatewayError, GatewayResult, ServiceError};
pub use operations::{find_route, route_for, HttpVerb, Operation, RouteInfo, ROUTES};
pub use permissions::RoleTable;
pub use roles::Role;
pub use types::*;
