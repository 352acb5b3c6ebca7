//! # fwgate Telemetry
//!
//! Structured logging for the fwgate gateway.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` registry with an `EnvFilter` and either
//!   a JSON layer (containers) or a human-readable layer (development)
//! - **Redaction**: recursive masking of credential-bearing fields before a
//!   structured payload is handed to a log macro
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fwgate_telemetry::{init_logging, TelemetryConfig};
//!
//! let config = TelemetryConfig::from_env();
//! init_logging(&config)?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `fwgate` | Service name attached to the startup event |
//! | `FWGATE_LOG_LEVEL` | `info` | Log level filter (falls back to `RUST_LOG`) |
//! | `FWGATE_CONSOLE_OUTPUT` | `true` | Console output at all |
//! | `FWGATE_JSON_LOGS` | `false` (`true` in containers) | JSON formatted output |

mod config;
mod logging;
pub mod redact;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use redact::{key_prefix, mask_sensitive, masked, MASK, SENSITIVE_KEYS};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize log subscriber: {0}")]
    SubscriberInit(String),

    #[error("Invalid log filter: {0}")]
    Filter(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TelemetryError::Filter("bad directive".into());
        assert_eq!(err.to_string(), "Invalid log filter: bad directive");
    }
}
