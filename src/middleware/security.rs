//! Origin and transport checks.
//!
//! Outermost layer of the pipeline: rejects plaintext traffic when HTTPS is
//! required, rejects browser requests from origins outside the allowlist and
//! stamps security headers on every response.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct SecurityPolicy {
    /// Empty list allows any origin
    pub allowed_origins: Vec<String>,
    pub require_https: bool,
    pub trust_proxy: bool,
}

impl SecurityPolicy {
    pub fn origin_allowed(&self, origin: &HeaderValue) -> bool {
        if self.allowed_origins.is_empty() {
            return true;
        }
        let Ok(origin) = origin.to_str() else {
            return false;
        };
        let origin = origin.trim_end_matches('/');
        self.allowed_origins
            .iter()
            .any(|allowed| allowed.trim_end_matches('/').eq_ignore_ascii_case(origin))
    }

    fn is_https<B>(&self, request: &Request<B>) -> bool {
        if self.trust_proxy {
            if let Some(proto) = request
                .headers()
                .get("x-forwarded-proto")
                .and_then(|v| v.to_str().ok())
            {
                return proto
                    .split(',')
                    .next()
                    .map(|p| p.trim().eq_ignore_ascii_case("https"))
                    .unwrap_or(false);
            }
        }
        request.uri().scheme_str() == Some("https")
    }
}

fn reject(code: &'static str, message: &'static str) -> Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({ "error": code, "message": message })),
    )
        .into_response()
}

pub async fn security_middleware(
    State(policy): State<Arc<SecurityPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if policy.require_https && !policy.is_https(&request) {
        warn!(path = %request.uri().path(), "Rejected plaintext request");
        return reject("InsecureTransport", "HTTPS is required");
    }

    if let Some(origin) = request.headers().get(header::ORIGIN) {
        if !policy.origin_allowed(origin) {
            warn!(origin = ?origin, path = %request.uri().path(), "Rejected request from disallowed origin");
            return reject("OriginNotAllowed", "Origin not allowed");
        }
    }

    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("no-referrer"),
    );
    if policy.require_https {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }

    response
}
