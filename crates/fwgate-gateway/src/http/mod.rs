//! REST surface.
//!
//! Every gated handler runs the same sequence: access check, then request
//! validation, then exactly one upstream call. Anything rejected before the
//! last step never reaches upstream.

pub mod routes;
pub mod state;

pub use routes::build_router;
pub use state::AppState;
