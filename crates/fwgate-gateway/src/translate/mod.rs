//! Mapping between the public schema and the upstream wire formats.
//!
//! Request-side mistakes are `BadRequest`. Any upstream body that does not
//! fit the supported shape is `UpstreamContractViolation`.

pub mod device;
pub mod import;
pub mod rules;
pub mod ticket;
pub mod topology;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::domain::error::{GatewayError, GatewayResult};

/// Deserialize an upstream body, mapping shape errors to a contract violation.
pub(crate) fn from_upstream<T: DeserializeOwned>(value: Value, what: &str) -> GatewayResult<T> {
    serde_json::from_value(value).map_err(|e| {
        warn!(response = what, error = %e, "Upstream response does not match expected shape");
        GatewayError::contract_violation(format!("Unexpected upstream {what} response"))
    })
}

/// Push `(name, value)` when the value is set and non-empty.
pub(crate) fn push_filter(query: &mut Vec<(String, String)>, name: &str, value: Option<&String>) {
    if let Some(value) = value.filter(|v| !v.is_empty()) {
        query.push((name.to_string(), value.clone()));
    }
}
