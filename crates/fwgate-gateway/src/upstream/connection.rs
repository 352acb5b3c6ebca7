//! Process-wide upstream connection lifecycle.
//!
//! ```text
//! Uninitialized ──open──▶ Open ──close──▶ Closed
//! ```
//!
//! Handlers borrow the client through [`UpstreamConnection::client`]. Outside
//! the `Open` state they get `ConnectionUnavailable` and never reach upstream.

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

use super::client::UpstreamClient;
use crate::domain::error::{GatewayError, GatewayResult, ServiceError};

enum State {
    Uninitialized,
    Open(Arc<UpstreamClient>),
    Closed,
}

/// Connection state shared by all handlers.
pub struct UpstreamConnection {
    state: RwLock<State>,
}

impl Default for UpstreamConnection {
    fn default() -> Self {
        Self::new()
    }
}

impl UpstreamConnection {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State::Uninitialized),
        }
    }

    /// Connection that is already open over `client`.
    pub fn opened(client: UpstreamClient) -> Self {
        Self {
            state: RwLock::new(State::Open(Arc::new(client))),
        }
    }

    pub fn open_with(&self, client: UpstreamClient) -> Result<(), ServiceError> {
        let mut state = self.state.write();
        match *state {
            State::Uninitialized => {
                *state = State::Open(Arc::new(client));
                info!("Upstream connection opened");
                Ok(())
            }
            State::Open(_) => Err(ServiceError::Lifecycle("upstream connection already open")),
            State::Closed => Err(ServiceError::Lifecycle("upstream connection closed")),
        }
    }

    /// Close the connection. In-flight calls keep their client until they finish.
    pub fn close(&self) {
        let previous = std::mem::replace(&mut *self.state.write(), State::Closed);
        match previous {
            State::Open(_) => info!("Upstream connection closed"),
            State::Uninitialized => warn!("Closing upstream connection that was never opened"),
            State::Closed => {}
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(*self.state.read(), State::Open(_))
    }

    /// Client for one request.
    pub fn client(&self) -> GatewayResult<Arc<UpstreamClient>> {
        match &*self.state.read() {
            State::Open(client) => Ok(Arc::clone(client)),
            State::Uninitialized | State::Closed => Err(GatewayError::ConnectionUnavailable(
                "Upstream connection is not available".into(),
            )),
        }
    }
}
