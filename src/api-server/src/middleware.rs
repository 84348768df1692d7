//! Middleware for request correlation, logging, and CORS

use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use uuid::Uuid;

/// Correlation id header name
pub const X_REQUEST_ID: &str = "x-request-id";

/// Correlation id supplied by the caller. Echoed back verbatim in response
/// headers and denial payloads; `None` when the caller sent none.
#[derive(Debug, Clone, Default)]
pub struct RequestId(pub Option<String>);

/// Extract the caller's correlation id and echo it on the response.
///
/// When no header is supplied a fresh UUID is used for the response header
/// and log correlation, but the body-level `request_id` stays unset.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let incoming = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    request.extensions_mut().insert(RequestId(incoming.clone()));

    let mut response = next.run(request).await;

    let echo = incoming.unwrap_or_else(|| Uuid::new_v4().to_string());
    if let Ok(value) = HeaderValue::from_str(&echo) {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }

    response
}

/// Structured request logging with latency and status-based level.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .cloned()
        .unwrap_or_default();

    let start = std::time::Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed();

    let status = response.status();
    let rid = request_id.0.as_deref().unwrap_or("-");
    let status_code = status.as_u16();
    let duration_ms = elapsed.as_millis() as u64;

    macro_rules! log_at {
        ($lvl:expr) => {
            tracing::event!(
                $lvl,
                request_id = rid,
                method = %method,
                uri = %uri,
                status = status_code,
                duration_ms = duration_ms,
                "request completed"
            )
        };
    }

    match status_code {
        500..=599 => log_at!(tracing::Level::ERROR),
        400..=499 => log_at!(tracing::Level::WARN),
        _ => log_at!(tracing::Level::INFO),
    }

    response
}

/// Permissive CORS for the module UIs; restrict origins in production.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(X_REQUEST_ID),
        ])
        .expose_headers([HeaderName::from_static(X_REQUEST_ID)])
}

/// Startup banner, shared by the binary and tests.
pub fn log_startup(addr: &std::net::SocketAddr) {
    info!(%addr, version = lattice_authz::VERSION, "authorization server listening");
}
