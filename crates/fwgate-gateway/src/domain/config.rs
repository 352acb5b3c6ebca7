//! Gateway configuration with validation.
//!
//! Loaded once at startup from an optional JSON file plus `FWGATE_*`
//! environment overrides, then shared read-only.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::domain::operations::{routed_operations, ROUTES};
use crate::domain::permissions::{default_permissions, default_workflows, RoleTable};

/// Environment variable naming the JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "FWGATE_CONFIG";

/// Main gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// HTTP server configuration
    pub http: HttpConfig,
    /// Upstream platform connection
    pub upstream: UpstreamConfig,
    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
    /// CORS configuration
    pub cors: CorsConfig,
    /// Request validation limits
    pub limits: LimitsConfig,
    /// Operation identifier to allowed roles
    pub permissions: RoleTable,
    /// Workflow name to roles allowed to open tickets under it
    pub workflows: RoleTable,
    /// Development-only keys loaded into the in-memory credential store
    pub bootstrap_keys: Vec<BootstrapKey>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig::default(),
            upstream: UpstreamConfig::default(),
            rate_limit: RateLimitConfig::default(),
            cors: CorsConfig::default(),
            limits: LimitsConfig::default(),
            permissions: default_permissions(),
            workflows: default_workflows(),
            bootstrap_keys: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// Load from `FWGATE_CONFIG` (if set) and apply environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(&path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let config = Self::from_json(&raw)?;
        info!(path = %path.display(), "Loaded configuration file");
        Ok(config)
    }

    /// Parse configuration from a JSON document.
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply `FWGATE_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("FWGATE_PORT") {
            self.http.port = parse_env("FWGATE_PORT", &port)?;
        }
        if let Some(url) = lookup("FWGATE_TICKETING_URL") {
            self.upstream.ticketing_url = url;
        }
        if let Some(url) = lookup("FWGATE_INVENTORY_URL") {
            self.upstream.inventory_url = url;
        }
        if let Some(url) = lookup("FWGATE_GRAPHQL_URL") {
            self.upstream.graphql_url = Some(url).filter(|u| !u.is_empty());
        }
        if let Some(username) = lookup("FWGATE_UPSTREAM_USERNAME") {
            self.upstream.username = username;
        }
        if let Some(password) = lookup("FWGATE_UPSTREAM_PASSWORD") {
            self.upstream.password = Secret::new(password);
        }
        if let Some(verify) = lookup("FWGATE_SSL_VERIFY") {
            self.upstream.ssl_verify = parse_env("FWGATE_SSL_VERIFY", &verify)?;
        }
        if let Some(timeout) = lookup("FWGATE_UPSTREAM_TIMEOUT") {
            self.upstream.timeout = humantime_serde::parse_duration(&timeout).map_err(|e| {
                ConfigError::InvalidEnv {
                    var: "FWGATE_UPSTREAM_TIMEOUT",
                    reason: e.to_string(),
                }
            })?;
        }
        if let Some(keys) = lookup("FWGATE_DEV_API_KEYS") {
            self.bootstrap_keys.extend(parse_bootstrap_keys(&keys));
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http.port == 0 {
            return Err(ConfigError::Invalid("http.port cannot be 0".into()));
        }

        // Validate upstream
        for (field, url) in [
            ("upstream.ticketing_url", Some(&self.upstream.ticketing_url)),
            ("upstream.inventory_url", Some(&self.upstream.inventory_url)),
            ("upstream.graphql_url", self.upstream.graphql_url.as_ref()),
        ] {
            if let Some(url) = url {
                reqwest::Url::parse(url).map_err(|e| ConfigError::InvalidUrl {
                    field,
                    reason: e.to_string(),
                })?;
            }
        }
        if self.upstream.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(
                "upstream.timeout cannot be 0".into(),
            ));
        }

        // Validate rate limits
        if self.rate_limit.default_per_minute == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "default_per_minute cannot be 0".into(),
            ));
        }
        for (key, quota) in &self.rate_limit.overrides {
            if *quota == 0 {
                return Err(ConfigError::InvalidRateLimit(format!(
                    "override for {key} cannot be 0"
                )));
            }
            if !ROUTES.iter().any(|route| route.limit_key() == key) {
                return Err(ConfigError::InvalidRateLimit(format!(
                    "override for unknown route {key}"
                )));
            }
        }

        // Validate limits
        if self.limits.max_request_size == 0 {
            return Err(ConfigError::InvalidLimit(
                "max_request_size cannot be 0".into(),
            ));
        }

        // Every routed operation needs a permission entry
        if let Some(missing) = routed_operations().find(|op| !self.permissions.contains(op.id())) {
            return Err(ConfigError::MissingPermission(missing.id().to_string()));
        }

        Ok(())
    }

    /// Get HTTP server bind address
    pub fn http_addr(&self) -> SocketAddr {
        SocketAddr::new(self.http.host, self.http.port)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Bind address
    pub host: IpAddr,
    /// Port (default: 8000)
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 8000,
        }
    }
}

/// Upstream platform connection settings, shared by every outbound call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Ticketing API base URL
    pub ticketing_url: String,
    /// Inventory API base URL
    pub inventory_url: String,
    /// GraphQL endpoint, defaults to `{inventory_url}/sg/api/v1/graphql`
    pub graphql_url: Option<String>,
    /// Basic-auth user
    pub username: String,
    /// Basic-auth password
    pub password: Secret,
    /// Verify upstream TLS certificates
    pub ssl_verify: bool,
    /// Per-call timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            ticketing_url: "https://securechange.invalid".to_string(),
            inventory_url: "https://securetrack.invalid".to_string(),
            graphql_url: None,
            username: String::new(),
            password: Secret::default(),
            ssl_verify: true,
            timeout: Duration::from_secs(30),
        }
    }
}

impl UpstreamConfig {
    /// Ticketing base URL without a trailing slash.
    pub fn ticketing_base(&self) -> &str {
        self.ticketing_url.trim_end_matches('/')
    }

    /// Inventory base URL without a trailing slash.
    pub fn inventory_base(&self) -> &str {
        self.inventory_url.trim_end_matches('/')
    }

    /// Effective GraphQL endpoint.
    pub fn graphql_endpoint(&self) -> String {
        match &self.graphql_url {
            Some(url) => url.clone(),
            None => format!("{}/sg/api/v1/graphql", self.inventory_base()),
        }
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    pub enabled: bool,
    /// Quota for routes without a built-in or configured limit
    pub default_per_minute: u32,
    /// Per-operation quotas replacing the built-in ones
    pub overrides: BTreeMap<String, u32>,
    /// IPs exempt from rate limiting
    pub whitelist: Vec<IpAddr>,
    /// How often stale buckets are swept
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
    /// Idle time after which a bucket is dropped
    #[serde(with = "humantime_serde")]
    pub bucket_max_age: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            default_per_minute: 60,
            overrides: BTreeMap::new(),
            whitelist: Vec::new(),
            cleanup_interval: Duration::from_secs(60),
            bucket_max_age: Duration::from_secs(300),
        }
    }
}

/// Request limits configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Max request body size in bytes (default: 1MB)
    pub max_request_size: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_request_size: 1024 * 1024, // 1MB
        }
    }
}

/// Browser cross-origin policy applied to every route.
///
/// `"*"` in `allowed_origins` or `allowed_headers` means any, and disables
/// `allow_credentials`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    pub enabled: bool,
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    /// Response headers readable by browser scripts
    pub expose_headers: Vec<String>,
    /// How long a browser may cache a preflight answer
    #[serde(with = "humantime_serde")]
    pub max_age: Duration,
    pub allow_credentials: bool,
}

impl Default for CorsConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            enabled: true,
            allowed_origins: strings(&["*"]),
            allowed_methods: strings(&["GET", "POST", "PUT", "OPTIONS"]),
            allowed_headers: strings(&["Content-Type", "X-API-Key"]),
            expose_headers: strings(&["X-Request-ID", "Retry-After"]),
            max_age: Duration::from_secs(24 * 60 * 60),
            allow_credentials: false,
        }
    }
}

/// Bootstrap credential entry. Either field may be missing; incomplete
/// entries are skipped when the store loads them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapKey {
    pub key: Option<Secret>,
    pub role: Option<String>,
}

/// String whose value never appears in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The secret value. Callers must not log it.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// Configuration errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("cannot read {path}: {reason}")]
    Io { path: String, reason: String },
    /// Configuration document is not valid
    #[error("cannot parse configuration: {0}")]
    Parse(String),
    /// Environment override has the wrong format
    #[error("invalid value for {var}: {reason}")]
    InvalidEnv { var: &'static str, reason: String },
    /// Upstream URL does not parse
    #[error("invalid url in {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
    /// Invalid rate limiting configuration
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    /// Invalid size or count limit
    #[error("invalid limit: {0}")]
    InvalidLimit(String),
    /// Invalid timeout value
    #[error("invalid timeout: {0}")]
    InvalidTimeout(String),
    /// A routed operation has no permission entry
    #[error("no permission entry for routed operation {0}")]
    MissingPermission(String),
    /// General configuration error
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

fn parse_env<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnv {
            var,
            reason: e.to_string(),
        })
}

/// Parse `FWGATE_DEV_API_KEYS`, a JSON list of `{"key": ..., "role": ...}`.
///
/// A malformed document loads nothing. A malformed entry is dropped alone.
fn parse_bootstrap_keys(raw: &str) -> Vec<BootstrapKey> {
    let entries: Vec<serde_json::Value> = match serde_json::from_str(raw) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(error = %e, "FWGATE_DEV_API_KEYS is not a JSON list, no keys loaded");
            return Vec::new();
        }
    };

    entries
        .into_iter()
        .enumerate()
        .filter_map(|(index, entry)| match serde_json::from_value(entry) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(index, error = %e, "Skipping malformed FWGATE_DEV_API_KEYS entry");
                None
            }
        })
        .collect()
}

/// Humantime serde module for Duration serialization
mod humantime_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_millis() == 0 {
            serializer.serialize_str(&format!("{}s", duration.as_secs()))
        } else {
            serializer.serialize_str(&format!("{}ms", duration.as_millis()))
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map_err(serde::de::Error::custom)
    }

    pub fn parse_duration(s: &str) -> Result<Duration, &'static str> {
        let s = s.trim();
        if let Some(ms) = s.strip_suffix("ms") {
            ms.trim()
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| "invalid milliseconds")
        } else if let Some(secs) = s.strip_suffix('s') {
            secs.trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid seconds")
        } else if let Some(mins) = s.strip_suffix('m') {
            mins.trim()
                .parse::<u64>()
                .ok()
                .and_then(|m| m.checked_mul(60))
                .map(Duration::from_secs)
                .ok_or("invalid minutes")
        } else {
            // Try parsing as plain seconds
            s.parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| "invalid duration format")
        }
    }
}
