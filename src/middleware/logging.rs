//! Request logging middleware.
//!
//! Logs every HTTP request with method, path, status code, client and latency.

use crate::middleware::{rate_limit::client_key, security::SecurityPolicy};
use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn, Instrument};

fn logged_client<B>(request: &Request<B>, policy: &SecurityPolicy) -> String {
    client_key(request, policy.trust_proxy)
}

/// Middleware that logs HTTP requests with timing information.
///
/// Logs at INFO level for successful and 4xx requests, WARN level for 5xx.
/// Health checks are skipped to reduce noise. The client address is resolved
/// the same way the rate limiter resolves it.
pub async fn request_logging(
    State(policy): State<Arc<SecurityPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    if path == "/health" {
        return next.run(request).await;
    }

    let client = logged_client(&request, &policy);
    let start = Instant::now();

    let span = tracing::info_span!(
        "http_request",
        method = %method,
        path = %path,
        client_ip = %client,
    );

    let response = next.run(request).instrument(span).await;

    let latency_ms = start.elapsed().as_millis() as u64;
    let status = response.status().as_u16();

    if status >= 500 {
        warn!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            client_ip = %client,
            "Request failed (5xx)"
        );
    } else if status >= 400 {
        info!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            client_ip = %client,
            "Request completed (4xx)"
        );
    } else {
        info!(
            method = %method,
            path = %path,
            status,
            latency_ms,
            "Request completed"
        );
    }

    response
}
