use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::{header, HeaderValue, Response as HttpResponse, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::{governor::GovernorConfigBuilder, GovernorError, GovernorLayer};

/// Type alias for the IP-based governor layers
pub type GlobalGovernorLayer = GovernorLayer<
    tower_governor::key_extractor::PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware<governor::clock::QuantaInstant>,
    Body,
>;

/// Create a GovernorLayer for global rate limiting (per IP address)
/// - 1000 requests per minute (one token every 60ms)
/// - Applied before authentication to protect against DDoS
pub fn create_global_governor() -> GlobalGovernorLayer {
    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(60) // One token every 60ms (1000 per minute)
            .burst_size(1000)    // Max capacity of the "window"
            .finish()
            .expect("global governor config is valid"),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}

/// Per-IP limit for unauthenticated routes: 100 requests per minute
pub fn create_public_governor() -> GlobalGovernorLayer {
    let config = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(600)
            .burst_size(100)
            .finish()
            .expect("public governor config is valid"),
    );

    GovernorLayer::new(config).error_handler(rate_limit_error_handler)
}

/// JSON body for rejected requests, matching the API's `{ "error": ... }` shape
pub fn rate_limit_error_handler(error: GovernorError) -> HttpResponse<Body> {
    match error {
        GovernorError::TooManyRequests { wait_time, headers } => {
            let mut response = (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": format!("Too many requests, retry in {} seconds", wait_time),
                })),
            )
                .into_response();

            if let Some(headers) = headers {
                response.headers_mut().extend(headers);
            }
            if let Ok(value) = HeaderValue::from_str(&wait_time.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
            response
        }
        GovernorError::UnableToExtractKey => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Unable to identify client for rate limiting" })),
        )
            .into_response(),
        GovernorError::Other { code, msg, .. } => (
            code,
            Json(json!({ "error": msg.unwrap_or_else(|| "Request rejected".to_string()) })),
        )
            .into_response(),
    }
}

/// Middleware to log rate limiting and request details
pub async fn log_request(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();

    tracing::debug!(
        client_ip = %addr.ip(),
        method = %method,
        uri = %uri,
        version = ?version,
        "Incoming request"
    );

    let response = next.run(request).await;
    let status = response.status();

    if status == StatusCode::TOO_MANY_REQUESTS {
        tracing::warn!(
            client_ip = %addr.ip(),
            method = %method,
            uri = %uri,
            status = %status,
            "Rate limited"
        );
    } else if status.is_client_error() || status.is_server_error() {
        tracing::warn!(
            client_ip = %addr.ip(),
            method = %method,
            uri = %uri,
            status = %status,
            "Request failed"
        );
    } else {
        tracing::debug!(
            client_ip = %addr.ip(),
            method = %method,
            uri = %uri,
            status = %status,
            "Request completed"
        );
    }

    response
}
