//! CORS layer built from gateway configuration.

use crate::domain::config::CorsConfig;
use axum::http::{HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};

/// Create CORS layer from gateway config.
///
/// A disabled config yields a layer that allows no origin, so browsers get
/// no CORS headers at all. Unparseable entries are skipped.
pub fn create_cors_layer(config: &CorsConfig) -> CorsLayer {
    if !config.enabled {
        return CorsLayer::new();
    }

    let wildcard = |values: &[String]| values.iter().any(|v| v == "*");
    let mut cors = CorsLayer::new();

    if wildcard(&config.allowed_origins) {
        cors = cors.allow_origin(Any);
    } else {
        let origins: Vec<_> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors = cors.allow_origin(origins);
    }

    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    cors = cors.allow_methods(methods);

    if wildcard(&config.allowed_headers) {
        cors = cors.allow_headers(Any);
    } else {
        cors = cors.allow_headers(header_names(&config.allowed_headers));
    }

    if !config.expose_headers.is_empty() {
        cors = cors.expose_headers(header_names(&config.expose_headers));
    }

    cors = cors.max_age(config.max_age);

    // Credentials cannot be combined with wildcards
    if config.allow_credentials
        && !wildcard(&config.allowed_origins)
        && !wildcard(&config.allowed_headers)
    {
        cors = cors.allow_credentials(true);
    }

    cors
}

fn header_names(values: &[String]) -> Vec<HeaderName> {
    values.iter().filter_map(|h| h.parse().ok()).collect()
}
