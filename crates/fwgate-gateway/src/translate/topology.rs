//! Topology path summarisation.

use serde::Deserialize;
use serde_json::Value;

use super::from_upstream;
use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::types::{TopologyPathQuery, TopologyPathResponse};

#[derive(Deserialize)]
struct PathDevice {
    name: Option<String>,
}

#[derive(Deserialize)]
struct UpstreamPath {
    traffic_allowed: bool,
    #[serde(default)]
    device_info: Option<Vec<PathDevice>>,
    #[serde(default)]
    unrouted_elements: Option<Vec<Value>>,
}

/// Upstream query parameters for a path query. All three are required.
pub fn path_params(query: &TopologyPathQuery) -> GatewayResult<Vec<(String, String)>> {
    [("src", &query.src), ("dst", &query.dst), ("service", &query.service)]
        .into_iter()
        .map(|(name, value)| {
            let value = value.trim();
            if value.is_empty() {
                Err(GatewayError::bad_request(format!("{name} must not be empty")))
            } else {
                Ok((name.to_string(), value.to_string()))
            }
        })
        .collect()
}

/// Reduce the upstream path result.
///
/// The path is fully routed when upstream reports no unrouted elements.
/// Device names are included only when traffic is allowed and fully routed.
pub fn path_from_upstream(body: Value) -> GatewayResult<TopologyPathResponse> {
    let path: UpstreamPath = from_upstream(body, "topology path")?;
    let is_fully_routed = path.unrouted_elements.map_or(true, |e| e.is_empty());

    let path_device_names = (path.traffic_allowed && is_fully_routed).then(|| {
        path.device_info
            .unwrap_or_default()
            .into_iter()
            .filter_map(|device| device.name)
            .collect()
    });

    Ok(TopologyPathResponse {
        traffic_allowed: path.traffic_allowed,
        is_fully_routed,
        path_device_names,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_allowed_and_routed_lists_devices() {
        let path = path_from_upstream(json!({
            "traffic_allowed": true,
            "device_info": [
                { "name": "edge-fw", "id": 1, "natList": [] },
                { "id": 2 },
                { "name": "core-fw", "bindings": [] }
            ],
            "unrouted_elements": []
        }))
        .unwrap();

        assert!(path.traffic_allowed);
        assert!(path.is_fully_routed);
        assert_eq!(
            path.path_device_names,
            Some(vec!["edge-fw".to_string(), "core-fw".to_string()])
        );
    }

    #[test]
    fn test_blocked_traffic_omits_device_names() {
        let path = path_from_upstream(json!({
            "traffic_allowed": false,
            "device_info": [{ "name": "edge-fw" }]
        }))
        .unwrap();
        assert!(path.is_fully_routed);
        assert_eq!(path.path_device_names, None);

        let json = serde_json::to_value(&path).unwrap();
        assert!(json.get("path_device_names").is_none());
    }

    #[test]
    fn test_unrouted_elements_omit_device_names() {
        let path = path_from_upstream(json!({
            "traffic_allowed": true,
            "device_info": [{ "name": "edge-fw" }],
            "unrouted_elements": [{ "source": ["10.0.0.1"], "destination": "10.9.9.9" }]
        }))
        .unwrap();
        assert!(!path.is_fully_routed);
        assert_eq!(path.path_device_names, None);
    }

    #[test]
    fn test_allowed_without_devices_is_empty_list() {
        let path = path_from_upstream(json!({ "traffic_allowed": true })).unwrap();
        assert_eq!(path.path_device_names, Some(Vec::new()));
    }

    #[test]
    fn test_missing_verdict_is_contract_violation() {
        assert!(matches!(
            path_from_upstream(json!({ "device_info": [] })),
            Err(GatewayError::UpstreamContractViolation(_))
        ));
    }

    #[test]
    fn test_path_params() {
        let query = TopologyPathQuery {
            src: "10.0.0.1".into(),
            dst: " 10.9.9.9:443 ".into(),
            service: "tcp:443".into(),
        };
        assert_eq!(
            path_params(&query).unwrap(),
            vec![
                ("src".to_string(), "10.0.0.1".to_string()),
                ("dst".to_string(), "10.9.9.9:443".to_string()),
                ("service".to_string(), "tcp:443".to_string()),
            ]
        );

        let query = TopologyPathQuery {
            service: "  ".into(),
            ..query
        };
        assert!(matches!(
            path_params(&query),
            Err(GatewayError::BadRequest(m)) if m.contains("service")
        ));
    }
}
