//! Axum middleware layers applied to the router.
//!
//! Includes request tracing, timeout enforcement, response compression, a
//! request body cap, CORS, and browser security headers.

use std::time::Duration;

use anyhow::{Context, Result};
use axum::http::{header, HeaderName, HeaderValue, Method};
use tower_http::cors::CorsLayer;

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Largest accepted request body.
pub const BODY_LIMIT: usize = 64 * 1024;

/// Response header carrying the unpaginated order count.
pub const TOTAL_COUNT_HEADER: HeaderName = HeaderName::from_static("x-total-count");

/// `Strict-Transport-Security` value, sent only when TLS terminates here.
pub const HSTS: HeaderValue = HeaderValue::from_static("max-age=31536000; includeSubDomains");

/// Security headers set on every response, overriding any handler value.
pub fn security_headers() -> [(HeaderName, HeaderValue); 3] {
    [
        (header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff")),
        (header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
        (header::REFERRER_POLICY, HeaderValue::from_static("no-referrer")),
    ]
}

/// CORS policy for the browser storefront.
///
/// With no origin configured the layer allows nothing cross-origin.
///
/// # Errors
///
/// Returns an error if `origin` is not a valid header value.
pub fn cors(origin: Option<&str>) -> Result<CorsLayer> {
    let Some(origin) = origin else {
        return Ok(CorsLayer::new());
    };
    let origin = HeaderValue::from_str(origin)
        .with_context(|| format!("CORS_ORIGIN is not a valid origin: {origin}"))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .expose_headers([TOTAL_COUNT_HEADER]))
}
