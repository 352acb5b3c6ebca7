//! Redaction of credential-bearing values before they reach a log sink.
//!
//! Field names are compared case-insensitively against [`SENSITIVE_KEYS`].
//! Masking recurses through nested objects and arrays.

use serde_json::Value;

/// Replacement written over sensitive values.
pub const MASK: &str = "***MASKED***";

/// Field names whose values never appear in logs.
pub const SENSITIVE_KEYS: &[&str] = &[
    "password",
    "upstream_password",
    "api_key",
    "x-api-key",
    "authorization",
    "secret",
    "token",
];

/// Number of key characters kept by [`key_prefix`].
const PREFIX_LEN: usize = 5;

fn is_sensitive(key: &str) -> bool {
    SENSITIVE_KEYS
        .iter()
        .any(|sensitive| sensitive.eq_ignore_ascii_case(key))
}

/// Mask every sensitive field of `value` in place.
pub fn mask_sensitive(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if is_sensitive(key) {
                    *inner = Value::String(MASK.to_string());
                } else {
                    mask_sensitive(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(mask_sensitive),
        _ => {}
    }
}

/// Masked copy of `value`, for call sites that only hold a reference.
pub fn masked(value: &Value) -> Value {
    let mut copy = value.clone();
    mask_sensitive(&mut copy);
    copy
}

/// Truncated form of a secret, safe to log for correlation.
///
/// Keeps at most five characters and always appends an ellipsis so a short
/// key is never printed whole.
pub fn key_prefix(secret: &str) -> String {
    let prefix: String = secret.chars().take(PREFIX_LEN).collect();
    format!("{prefix}...")
}
