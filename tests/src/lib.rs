//! # fwgate Test Suite
//!
//! End-to-end flows against a gateway bound to a real local listener, with
//! the upstream platform replaced by a scripted transport.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── mod.rs      # Server fixture
//!     └── flows.rs    # Caller-visible request flows
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p fwgate-tests
//! ```

#[cfg(test)]
mod integration;
