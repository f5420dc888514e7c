use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

/// Restricts browsers to the portal origin. Falls back to any origin when
/// the configured URL is not a valid header value.
pub fn portal_cors(portal_url: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);
    match HeaderValue::from_str(portal_url.trim_end_matches('/')) {
        Ok(origin) => layer.allow_origin(origin),
        Err(_) => {
            tracing::warn!(portal_url, "PORTAL_URL is not a valid origin, allowing any");
            layer.allow_origin(Any)
        }
    }
}
