//! Shared ingress middleware

use crate::types::RequestMetadata;
use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, info_span};

/// Attach [`RequestMetadata`] and a tracing span to every request
///
/// An incoming `x-request-id` is reused so the id can be correlated with the caller,
/// and is echoed back on the response.
pub async fn request_context_middleware(mut req: Request, next: Next) -> Response {
    let metadata = RequestMetadata::from_headers(req.headers());
    let request_id = metadata.request_id.clone();

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path(),
        client_ip = metadata.client_ip.as_deref().unwrap_or("-"),
    );

    req.extensions_mut().insert(metadata);

    let mut response = next.run(req).instrument(span).await;

    if let Ok(value) = HeaderValue::from_str(request_id.as_str()) {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

const CORS_HEADERS: [(HeaderName, &str); 4] = [
    (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
    (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, OPTIONS"),
    (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type, X-Request-ID"),
    (header::ACCESS_CONTROL_MAX_AGE, "3600"),
];

const SECURITY_HEADERS: [(HeaderName, &str); 3] = [
    (header::X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (header::X_FRAME_OPTIONS, "DENY"),
    (header::STRICT_TRANSPORT_SECURITY, "max-age=31536000; includeSubDomains"),
];

fn insert_static(headers: &mut HeaderMap, pairs: &[(HeaderName, &'static str)]) {
    for (name, value) in pairs {
        headers.insert(name.clone(), HeaderValue::from_static(*value));
    }
}

/// Middleware for CORS headers
///
/// Answers preflight requests directly with 204.
pub async fn cors_middleware(req: Request, next: Next) -> Response {
    let mut response = if req.method() == Method::OPTIONS {
        let mut preflight = Response::new(Body::empty());
        *preflight.status_mut() = StatusCode::NO_CONTENT;
        preflight
    } else {
        next.run(req).await
    };

    insert_static(response.headers_mut(), &CORS_HEADERS);

    response
}

/// Middleware to add security headers
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let mut response = next.run(req).await;

    insert_static(response.headers_mut(), &SECURITY_HEADERS);

    response
}
