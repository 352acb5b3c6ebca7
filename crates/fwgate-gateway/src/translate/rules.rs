//! Rule search over the upstream GraphQL endpoint.
//!
//! The query document is fixed; the caller only supplies the TQL filter,
//! which travels as a GraphQL variable and is never spliced into the query.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use super::from_upstream;
use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::types::{RuleQueryResponse, RuleResponse};

pub const RULES_QUERY: &str = "query rules($filter: String) { rules(filter: $filter) { count values { id name action disabled device { name } source { name } destination { name } service { name } } } }";

/// Longest accepted filter, in bytes.
pub const MAX_FILTER_LEN: usize = 4096;

pub fn validate_filter(filter: &str) -> GatewayResult<&str> {
    let filter = filter.trim();
    if filter.is_empty() {
        return Err(GatewayError::bad_request("tql_filter must not be empty"));
    }
    if filter.len() > MAX_FILTER_LEN {
        return Err(GatewayError::bad_request(format!(
            "tql_filter exceeds {MAX_FILTER_LEN} bytes"
        )));
    }
    if filter.chars().any(char::is_control) {
        return Err(GatewayError::bad_request(
            "tql_filter must not contain control characters",
        ));
    }
    Ok(filter)
}

/// GraphQL request body for a validated filter.
pub fn query_body(filter: &str) -> GatewayResult<Value> {
    let filter = validate_filter(filter)?;
    Ok(json!({
        "query": RULES_QUERY,
        "variables": { "filter": filter },
    }))
}

#[derive(Deserialize)]
struct Named {
    name: Option<String>,
}

#[derive(Deserialize)]
struct GraphqlRule {
    /// GraphQL `ID`, always serialized as a string
    id: String,
    name: Option<String>,
    action: Option<String>,
    #[serde(default)]
    disabled: bool,
    device: Option<Named>,
    #[serde(default)]
    source: Vec<Named>,
    #[serde(default)]
    destination: Vec<Named>,
    #[serde(default)]
    service: Vec<Named>,
}

#[derive(Deserialize)]
struct RulePage {
    count: u64,
    #[serde(default)]
    values: Vec<GraphqlRule>,
}

#[derive(Deserialize)]
struct RulesData {
    rules: RulePage,
}

#[derive(Deserialize)]
struct GraphqlMessage {
    message: Option<String>,
}

#[derive(Deserialize)]
struct GraphqlEnvelope {
    data: Option<RulesData>,
    #[serde(default)]
    errors: Vec<GraphqlMessage>,
}

fn names(refs: Vec<Named>) -> Vec<String> {
    refs.into_iter().filter_map(|r| r.name).collect()
}

/// Translate a GraphQL response.
///
/// GraphQL reports filter mistakes in `errors` with a 200 status; those are
/// the caller's, so they surface as `BadRequest`.
pub fn rules_from_graphql(body: Value) -> GatewayResult<RuleQueryResponse> {
    let envelope: GraphqlEnvelope = from_upstream(body, "rule query")?;

    if !envelope.errors.is_empty() {
        let messages: Vec<_> = envelope
            .errors
            .into_iter()
            .filter_map(|e| e.message)
            .collect();
        warn!(errors = messages.len(), "Rule query rejected by upstream");
        let detail = if messages.is_empty() {
            "Rule query rejected".to_string()
        } else {
            format!("Rule query rejected: {}", messages.join("; "))
        };
        return Err(GatewayError::bad_request(detail));
    }

    let Some(data) = envelope.data else {
        return Err(GatewayError::contract_violation(
            "Upstream rule query returned no data",
        ));
    };

    let rules = data
        .rules
        .values
        .into_iter()
        .map(|rule| RuleResponse {
            id: rule.id,
            name: rule.name,
            action: rule.action,
            disabled: rule.disabled,
            device_name: rule.device.and_then(|d| d.name),
            sources: names(rule.source),
            destinations: names(rule.destination),
            services: names(rule.service),
        })
        .collect();

    Ok(RuleQueryResponse {
        rules,
        count: data.rules.count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_body_uses_variables() {
        let filter = "action = 'accept' and source.ip = '10.0.0.1'";
        let body = query_body(filter).unwrap();
        assert_eq!(body["query"], RULES_QUERY);
        assert_eq!(body["variables"]["filter"], filter);
        assert!(!body["query"].as_str().unwrap().contains("10.0.0.1"));
    }

    #[test]
    fn test_filter_validation() {
        assert!(validate_filter("   ").is_err());
        assert!(validate_filter("name = 'a'\n").is_ok());
        assert!(validate_filter("name = 'a'\u{0}").is_err());
        assert!(validate_filter("name = 'a'\n and action = 'drop'").is_err());
        assert!(validate_filter(&"x".repeat(MAX_FILTER_LEN)).is_ok());
        assert!(validate_filter(&"x".repeat(MAX_FILTER_LEN + 1)).is_err());
    }

    #[test]
    fn test_rules_translation() {
        let response = rules_from_graphql(json!({
            "data": {
                "rules": {
                    "count": 2,
                    "values": [
                        {
                            "id": "r-1",
                            "name": "allow-web",
                            "action": "accept",
                            "disabled": false,
                            "device": { "name": "edge-fw" },
                            "source": [{ "name": "lan" }, { "name": null }],
                            "destination": [{ "name": "web" }],
                            "service": [{ "name": "https" }]
                        },
                        { "id": "77", "disabled": true, "device": null }
                    ]
                }
            }
        }))
        .unwrap();

        assert_eq!(response.count, 2);
        assert_eq!(
            response.rules[0],
            RuleResponse {
                id: "r-1".into(),
                name: Some("allow-web".into()),
                action: Some("accept".into()),
                disabled: false,
                device_name: Some("edge-fw".into()),
                sources: vec!["lan".into()],
                destinations: vec!["web".into()],
                services: vec!["https".into()],
            }
        );
        assert_eq!(response.rules[1].id, "77");
        assert!(response.rules[1].disabled);
        assert!(response.rules[1].sources.is_empty());
    }

    #[test]
    fn test_numeric_rule_id_is_contract_violation() {
        let result = rules_from_graphql(json!({
            "data": { "rules": { "count": 1, "values": [{ "id": 77 }] } }
        }));
        assert!(matches!(
            result,
            Err(GatewayError::UpstreamContractViolation(_))
        ));
    }

    #[test]
    fn test_graphql_errors_are_bad_request() {
        let result = rules_from_graphql(json!({
            "data": null,
            "errors": [{ "message": "Unknown field 'colour'" }]
        }));
        assert_eq!(
            result.unwrap_err(),
            GatewayError::bad_request("Rule query rejected: Unknown field 'colour'")
        );
    }

    #[test]
    fn test_missing_data_is_contract_violation() {
        for body in [json!({}), json!({ "data": null }), json!({ "data": { "rules": {} } })] {
            assert!(matches!(
                rules_from_graphql(body),
                Err(GatewayError::UpstreamContractViolation(_))
            ));
        }
    }
}
