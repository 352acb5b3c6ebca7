//! Bulk device registration and managed-device import bodies.

use serde_json::{json, Map, Value};

use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::types::{BulkDevicesRequest, DeviceImportEntry, DeviceImportRequest};

/// Keys the gateway writes into each `device_data` object.
pub const GENERATED_IMPORT_KEYS: [&str; 5] = [
    "import_all",
    "import_devices",
    "collect_rule_usage_traffic",
    "collect_object_usage_traffic",
    "enable_topology",
];

/// Upstream body for bulk registration. Device definitions pass through untouched.
pub fn bulk_body(request: &BulkDevicesRequest) -> GatewayResult<Value> {
    if request.devices.is_empty() {
        return Err(GatewayError::bad_request("devices must not be empty"));
    }
    Ok(json!({ "devices": request.devices }))
}

/// Upstream body for a managed-device import.
pub fn import_body(request: &DeviceImportRequest) -> GatewayResult<Value> {
    if request.devices.is_empty() {
        return Err(GatewayError::bad_request("devices must not be empty"));
    }
    let devices = request
        .devices
        .iter()
        .map(import_entry)
        .collect::<GatewayResult<Vec<_>>>()?;
    Ok(json!({ "devices": devices }))
}

fn import_entry(entry: &DeviceImportEntry) -> GatewayResult<Value> {
    let device_id = entry.device_id.trim();
    if device_id.is_empty() {
        return Err(GatewayError::bad_request("device_id must not be empty"));
    }
    match (entry.import_all, entry.targets.is_empty()) {
        (true, false) => {
            return Err(GatewayError::bad_request(format!(
                "device {device_id}: import_all cannot be combined with targets"
            )))
        }
        (false, true) => {
            return Err(GatewayError::bad_request(format!(
                "device {device_id}: either import_all or targets is required"
            )))
        }
        _ => {}
    }
    if entry.targets.iter().any(|t| t.trim().is_empty()) {
        return Err(GatewayError::bad_request(format!(
            "device {device_id}: import targets must not be empty"
        )));
    }

    let mut data = entry.vendor_payload.clone().unwrap_or_default();
    if let Some(key) = GENERATED_IMPORT_KEYS.iter().find(|k| data.contains_key(**k)) {
        return Err(GatewayError::bad_request(format!(
            "vendor_payload must not contain '{key}'"
        )));
    }

    data.insert("import_all".into(), Value::Bool(entry.import_all));
    if !entry.import_all {
        let targets = entry
            .targets
            .iter()
            .map(|name| json!({ "name": name.trim() }))
            .collect();
        data.insert("import_devices".into(), Value::Array(targets));
    }
    insert_flag(&mut data, "collect_rule_usage_traffic", entry.collect_rule_usage_traffic);
    insert_flag(&mut data, "collect_object_usage_traffic", entry.collect_object_usage_traffic);
    insert_flag(&mut data, "enable_topology", entry.enable_topology);

    Ok(json!({ "device_id": device_id, "device_data": data }))
}

fn insert_flag(data: &mut Map<String, Value>, key: &str, flag: Option<bool>) {
    if let Some(flag) = flag {
        data.insert(key.to_string(), Value::Bool(flag));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(device_id: &str) -> DeviceImportEntry {
        DeviceImportEntry {
            device_id: device_id.into(),
            ..DeviceImportEntry::default()
        }
    }

    #[test]
    fn test_import_named_targets() {
        let request = DeviceImportRequest {
            devices: vec![DeviceImportEntry {
                targets: vec!["fw-a".into(), " fw-b ".into()],
                enable_topology: Some(true),
                ..entry("12")
            }],
        };
        assert_eq!(
            import_body(&request).unwrap(),
            json!({
                "devices": [{
                    "device_id": "12",
                    "device_data": {
                        "import_all": false,
                        "import_devices": [{ "name": "fw-a" }, { "name": "fw-b" }],
                        "enable_topology": true
                    }
                }]
            })
        );
    }

    #[test]
    fn test_import_all_keeps_vendor_payload() {
        let mut payload = Map::new();
        payload.insert("domain_id".into(), json!(3));
        let request = DeviceImportRequest {
            devices: vec![DeviceImportEntry {
                import_all: true,
                collect_rule_usage_traffic: Some(false),
                vendor_payload: Some(payload),
                ..entry("9")
            }],
        };
        let body = import_body(&request).unwrap();
        let data = &body["devices"][0]["device_data"];
        assert_eq!(data["import_all"], json!(true));
        assert_eq!(data["domain_id"], json!(3));
        assert_eq!(data["collect_rule_usage_traffic"], json!(false));
        assert!(data.get("import_devices").is_none());
        assert!(data.get("enable_topology").is_none());
    }

    #[test]
    fn test_import_rejections() {
        let mut payload = Map::new();
        payload.insert("import_devices".into(), json!([]));

        let cases = [
            vec![],
            vec![entry(" ")],
            vec![entry("1")],
            vec![DeviceImportEntry {
                import_all: true,
                targets: vec!["fw".into()],
                ..entry("1")
            }],
            vec![DeviceImportEntry {
                targets: vec!["".into()],
                ..entry("1")
            }],
            vec![DeviceImportEntry {
                import_all: true,
                vendor_payload: Some(payload),
                ..entry("1")
            }],
        ];
        for devices in cases {
            let result = import_body(&DeviceImportRequest { devices });
            assert!(matches!(result, Err(GatewayError::BadRequest(_))));
        }
    }

    #[test]
    fn test_bulk_body_is_verbatim() {
        let mut device = Map::new();
        device.insert("model".into(), json!("fmg"));
        device.insert("display_name".into(), json!("FMG-1"));
        let body = bulk_body(&BulkDevicesRequest {
            devices: vec![device],
        })
        .unwrap();
        assert_eq!(
            body,
            json!({ "devices": [{ "model": "fmg", "display_name": "FMG-1" }] })
        );

        assert!(bulk_body(&BulkDevicesRequest { devices: vec![] }).is_err());
    }
}
