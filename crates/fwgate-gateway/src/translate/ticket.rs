//! Ticket translation.
//!
//! Upstream wraps a single ticket under `ticket` and a list under
//! `tickets.ticket`. Reads flatten the nested workflow and step objects.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{from_upstream, push_filter};
use crate::domain::error::{GatewayError, GatewayResult};
use crate::domain::types::{
    TicketCreateRequest, TicketListQuery, TicketListResponse, TicketResponse, TicketUpdateRequest,
};

/// Default page size.
pub const DEFAULT_LIMIT: u32 = 100;
/// Largest page a caller may request.
pub const MAX_LIMIT: u32 = 1000;

/// Keys the gateway writes into an upstream ticket; `details` may not set them.
pub const RESERVED_TICKET_KEYS: [&str; 7] = [
    "id",
    "subject",
    "description",
    "priority",
    "requester",
    "workflow",
    "workflow_name",
];

/// Upstream query parameter for each public list filter.
fn filter_values(query: &TicketListQuery) -> [(&'static str, Option<&String>); 4] {
    [
        ("status", query.status.as_ref()),
        ("workflow_name", query.workflow.as_ref()),
        ("requester", query.requester.as_ref()),
        ("subject", query.subject.as_ref()),
    ]
}

/// Validated paging for a ticket list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub limit: u32,
    pub offset: u32,
}

/// Upstream query parameters and paging for a ticket list.
pub fn ticket_filters(query: &TicketListQuery) -> GatewayResult<(Vec<(String, String)>, Page)> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);
    if !(1..=MAX_LIMIT).contains(&limit) {
        return Err(GatewayError::bad_request(format!(
            "limit must be between 1 and {MAX_LIMIT}"
        )));
    }
    let page = Page {
        limit,
        offset: query.offset.unwrap_or(0),
    };

    let mut params = Vec::new();
    for (upstream, value) in filter_values(query) {
        push_filter(&mut params, upstream, value);
    }
    params.push(("count".to_string(), page.limit.to_string()));
    params.push(("start".to_string(), page.offset.to_string()));

    Ok((params, page))
}

#[derive(Deserialize)]
struct NamedRef {
    name: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StepRef {
    Named(NamedRef),
    Plain(String),
}

#[derive(Deserialize)]
struct UpstreamTicket {
    id: u64,
    subject: String,
    status: Option<String>,
    priority: Option<String>,
    requester: Option<String>,
    workflow_name: Option<String>,
    workflow: Option<NamedRef>,
    current_step: Option<StepRef>,
    description: Option<String>,
}

impl From<UpstreamTicket> for TicketResponse {
    fn from(ticket: UpstreamTicket) -> Self {
        let workflow_name = ticket
            .workflow_name
            .or_else(|| ticket.workflow.and_then(|w| w.name));
        let current_step = ticket.current_step.and_then(|step| match step {
            StepRef::Named(named) => named.name,
            StepRef::Plain(name) => Some(name),
        });

        Self {
            id: ticket.id,
            subject: ticket.subject,
            status: ticket.status,
            priority: ticket.priority,
            requester: ticket.requester,
            workflow_name,
            current_step,
            description: ticket.description,
        }
    }
}

#[derive(Deserialize)]
struct SingleTicket {
    ticket: UpstreamTicket,
}

#[derive(Deserialize)]
struct Link {
    href: String,
}

#[derive(Deserialize)]
struct TicketBatch {
    #[serde(default)]
    ticket: Vec<UpstreamTicket>,
    total: Option<u64>,
    next: Option<Link>,
    previous: Option<Link>,
}

#[derive(Deserialize)]
struct UpstreamTicketList {
    tickets: TicketBatch,
    total: Option<u64>,
}

/// Flatten a single upstream ticket.
pub fn ticket_from_upstream(body: Value) -> GatewayResult<TicketResponse> {
    let single: SingleTicket = from_upstream(body, "ticket")?;
    Ok(single.ticket.into())
}

/// Flatten an upstream ticket page. Links pass through verbatim; a missing
/// total becomes the batch size.
pub fn ticket_list_from_upstream(body: Value, page: Page) -> GatewayResult<TicketListResponse> {
    let list: UpstreamTicketList = from_upstream(body, "ticket list")?;
    let batch = list.tickets;
    let total = batch
        .total
        .or(list.total)
        .unwrap_or(batch.ticket.len() as u64);

    Ok(TicketListResponse {
        tickets: batch.ticket.into_iter().map(TicketResponse::from).collect(),
        total,
        limit: page.limit,
        offset: page.offset,
        next: batch.next.map(|link| link.href),
        previous: batch.previous.map(|link| link.href),
    })
}

/// Upstream creation body.
///
/// `details` entries are merged into the ticket object. An entry whose key is
/// one of [`RESERVED_TICKET_KEYS`] is rejected rather than overwritten.
pub fn create_body(request: &TicketCreateRequest) -> GatewayResult<Value> {
    if request.subject.trim().is_empty() {
        return Err(GatewayError::bad_request("subject must not be empty"));
    }

    let mut ticket = Map::new();
    if let Some(details) = &request.details {
        if let Some(key) = details
            .keys()
            .find(|key| RESERVED_TICKET_KEYS.contains(&key.as_str()))
        {
            return Err(GatewayError::bad_request(format!(
                "details may not set reserved ticket field '{key}'"
            )));
        }
        ticket.extend(details.iter().map(|(k, v)| (k.clone(), v.clone())));
    }

    ticket.insert("subject".into(), Value::String(request.subject.clone()));
    for (key, value) in [
        ("description", &request.description),
        ("priority", &request.priority),
        ("requester", &request.requester),
    ] {
        if let Some(value) = value {
            ticket.insert(key.into(), Value::String(value.clone()));
        }
    }
    ticket.insert("workflow".into(), json!({ "name": request.workflow_name }));

    Ok(json!({ "ticket": ticket }))
}

/// Upstream update body carrying only the fields the caller set.
pub fn update_body(request: &TicketUpdateRequest) -> GatewayResult<Value> {
    if request.is_empty() {
        return Err(GatewayError::bad_request(
            "ticket update must set at least one field",
        ));
    }
    let fields = serde_json::to_value(request)
        .map_err(|e| GatewayError::bad_request(format!("invalid ticket update: {e}")))?;
    Ok(json!({ "ticket": fields }))
}
