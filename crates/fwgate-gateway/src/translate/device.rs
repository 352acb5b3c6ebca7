//! Device translation.
//!
//! Upstream and public device fields are related by [`RENAMES`], a bijection
//! over the covered fields. Fields outside the table are dropped.

use serde::Deserialize;
use serde_json::{Map, Value};

use super::{from_upstream, push_filter};
use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::types::{DeviceListQuery, DeviceListResponse, DeviceResponse};

/// `(upstream name, public name)` pairs.
pub const RENAMES: [(&str, &str); 8] = [
    ("id", "id"),
    ("name", "name"),
    ("vendor", "vendor"),
    ("model", "model"),
    ("OS_Version", "version"),
    ("ip", "ip_address"),
    ("domain_name", "domain"),
    ("status", "status"),
];

/// Rename direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToPublic,
    ToUpstream,
}

/// Copy the covered fields of `source` under their names in `direction`.
pub fn rename_fields(source: &Map<String, Value>, direction: Direction) -> Map<String, Value> {
    RENAMES
        .iter()
        .filter_map(|&(upstream, public)| {
            let (from, to) = match direction {
                Direction::ToPublic => (upstream, public),
                Direction::ToUpstream => (public, upstream),
            };
            source.get(from).map(|v| (to.to_string(), v.clone()))
        })
        .collect()
}

/// Translate one upstream device object.
pub fn device_from_upstream(device: &Value) -> GatewayResult<DeviceResponse> {
    let Value::Object(fields) = device else {
        return Err(GatewayError::contract_violation(
            "Unexpected upstream device response",
        ));
    };
    from_upstream(Value::Object(rename_fields(fields, Direction::ToPublic)), "device")
}

#[derive(Deserialize)]
struct UpstreamDeviceList {
    #[serde(default)]
    device: Vec<Value>,
    count: u64,
    total: u64,
}

/// Translate an upstream device list, keeping its counters verbatim.
pub fn device_list_from_upstream(body: Value) -> GatewayResult<DeviceListResponse> {
    let list: UpstreamDeviceList = from_upstream(body, "device list")?;
    let devices = list
        .device
        .iter()
        .map(device_from_upstream)
        .collect::<GatewayResult<Vec<_>>>()?;

    Ok(DeviceListResponse {
        devices,
        count: list.count,
        total: list.total,
    })
}

/// Upstream query parameters for a device list.
pub fn device_filters(query: &DeviceListQuery) -> Vec<(String, String)> {
    let mut params = Vec::new();
    push_filter(&mut params, "status", query.status.as_ref());
    push_filter(&mut params, "name", query.name.as_ref());
    push_filter(&mut params, "vendor", query.vendor.as_ref());
    params
}
