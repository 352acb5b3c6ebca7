//! Outbound side of the gateway.
//!
//! ```text
//! handler ──▶ UpstreamConnection::client() ──▶ UpstreamClient ──▶ UpstreamTransport
//!                                                  │
//!                                             translate::*
//! ```

pub mod client;
pub mod connection;
pub mod transport;

pub use client::{PathImage, UpstreamClient};
pub use connection::UpstreamConnection;
pub use transport::{
    Accept, HttpTransport, TransportError, UpstreamRequest, UpstreamResponse, UpstreamTransport,
};
