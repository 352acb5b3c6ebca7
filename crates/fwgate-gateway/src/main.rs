//! # fwgate
//!
//! Gateway binary.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging from `FWGATE_LOG_LEVEL` / `FWGATE_JSON_LOGS`
//! 2. Load configuration (`FWGATE_CONFIG` file, then `FWGATE_*` overrides)
//! 3. Build the upstream HTTP transport
//! 4. Serve until Ctrl+C, then drain and close the upstream connection

use anyhow::{Context, Result};
use fwgate_gateway::{GatewayConfig, GatewayService, VERSION};
use fwgate_telemetry::{init_logging, TelemetryConfig};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let telemetry = TelemetryConfig::from_env();
    init_logging(&telemetry).context("failed to initialize logging")?;

    let config = GatewayConfig::load().context("failed to load configuration")?;
    info!(
        version = VERSION,
        addr = %config.http_addr(),
        rate_limiting = config.rate_limit.enabled,
        bootstrap_keys = config.bootstrap_keys.len(),
        "Starting fwgate"
    );
    if config.upstream.username.is_empty() || config.upstream.password.is_empty() {
        warn!("Upstream credentials are not configured");
    }

    let service = GatewayService::from_config(config).context("failed to build gateway")?;

    service
        .start(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for Ctrl+C, shutting down");
            }
        })
        .await?;

    Ok(())
}
