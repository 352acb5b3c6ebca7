//! Middleware stack.
//!
//! Layer order, outermost first:
//!
//! ```text
//! Request → RequestContext → CORS → RateLimit → BodyLimit → Handler
//! ```
//!
//! Rate limiting runs before any handler, so rejected requests never
//! authenticate or reach upstream. An oversized body still spends the
//! route's quota before the body limit answers 413.

pub mod cors;
pub mod rate_limit;
pub mod request_context;

pub use cors::create_cors_layer;
pub use rate_limit::{cleanup_task, extract_client_ip, RateLimitLayer, RateLimitState};
pub use request_context::{RequestContextLayer, RequestId, REQUEST_ID_HEADER};
