//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::AccessControl;
use crate::upstream::UpstreamConnection;

#[derive(Clone)]
pub struct AppState {
    pub access: AccessControl,
    pub upstream: Arc<UpstreamConnection>,
}

impl AppState {
    pub fn new(access: AccessControl, upstream: Arc<UpstreamConnection>) -> Self {
        Self { access, upstream }
    }
}
