#![allow(missing_docs)]

//! fwgate - role-gated REST gateway for a network-security management
//! platform.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                             fwgate                                   │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  ┌────────────────────────────────────────────────────────────────┐  │
//! │  │ Middleware: RequestContext → CORS → RateLimit → BodyLimit      │  │
//! │  └──────────────────────────────┬─────────────────────────────────┘  │
//! │                                 │                                    │
//! │  ┌──────────────────────────────┴─────────────────────────────────┐  │
//! │  │ Handlers: AccessControl (API key → role → permission)          │  │
//! │  └──────────────────────────────┬─────────────────────────────────┘  │
//! │                                 │                                    │
//! │  ┌──────────────────────────────┴─────────────────────────────────┐  │
//! │  │ UpstreamClient + translate (public schema ⇄ upstream formats)  │  │
//! │  └──────────────────────────────┬─────────────────────────────────┘  │
//! └─────────────────────────────────┼────────────────────────────────────┘
//!                                   │ HTTPS, basic auth
//!          ┌────────────────────────┼────────────────────────┐
//!          ▼                        ▼                        ▼
//!     ticketing API           inventory API           GraphQL endpoint
//! ```
//!
//! # Roles
//!
//! - **admin**: everything, including device registration and import
//! - **ticket_manager**: ticket changes and topology path queries
//! - **user**: read-only operations
//!
//! The operation and workflow tables are configuration; see
//! [`domain::permissions`].
//!
//! # Usage
//!
//! ```ignore
//! use fwgate_gateway::{GatewayConfig, GatewayService, upstream::HttpTransport};
//!
//! let config = GatewayConfig::load()?;
//! let transport = Arc::new(HttpTransport::new(&config.upstream)?);
//! let service = GatewayService::new(config, transport)?;
//! service.start(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod auth;
pub mod domain;
pub mod http;
pub mod middleware;
pub mod service;
pub mod translate;
pub mod upstream;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use domain::config::GatewayConfig;
pub use domain::error::{GatewayError, GatewayResult, ServiceError};
pub use domain::types::*;
pub use service::GatewayService;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
