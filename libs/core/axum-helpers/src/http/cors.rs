use axum::http::{HeaderValue, Method};
use core_config::Environment;
use std::time::Duration;
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Creates a CORS layer for an explicit list of origins.
///
/// Allows the methods the catalog routes use, the `Content-Type` and
/// `Accept` headers, and caches preflight results for an hour.
pub fn create_cors_layer(allowed_origins: Vec<HeaderValue>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .max_age(Duration::from_secs(3600))
}

/// Creates a permissive CORS layer for development.
///
/// Allows any origin - **DO NOT USE IN PRODUCTION**.
pub fn create_permissive_cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}

/// Picks the CORS layer for the configured origins.
///
/// Configured origins always win. With none configured, development gets a
/// permissive layer and production gets no CORS layer at all.
pub fn cors_layer_for(
    origins: &[String],
    environment: &Environment,
) -> Result<Option<CorsLayer>, std::io::Error> {
    if origins.is_empty() {
        return Ok(environment.is_development().then(create_permissive_cors_layer));
    }

    let values = origins
        .iter()
        .map(|origin| {
            origin.parse::<HeaderValue>().map_err(|e| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("Invalid CORS origin '{}': {}", origin, e),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Some(create_cors_layer(values)))
}
