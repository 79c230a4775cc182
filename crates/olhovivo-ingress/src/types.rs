//! Shared ingress types and utilities

use axum::http::{HeaderMap, header};
use olhovivo_core::Error as CoreError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Request ID for tracing
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new request ID
    pub fn generate() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let count = COUNTER.fetch_add(1, Ordering::Relaxed);
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_micros())
            .unwrap_or_default();

        Self(format!("req_{:x}_{:x}", timestamp, count))
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ingress error: a core error rendered as an HTTP response
#[derive(Debug, Error)]
#[error(transparent)]
pub struct IngressError(#[from] pub CoreError);

impl axum::response::IntoResponse for IngressError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = StatusCode::from_u16(self.0.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, axum::Json(self.0.to_error_response())).into_response()
    }
}

/// Ingress result type
pub type IngressResult<T> = Result<T, IngressError>;

/// Caller details captured by the request context middleware
///
/// Stored in request extensions; the search handler reads it for request logging.
#[derive(Debug, Clone)]
pub struct RequestMetadata {
    pub request_id: RequestId,
    /// First hop of `x-forwarded-for`, else `x-real-ip`
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMetadata {
    /// Collect metadata from inbound headers, reusing a caller-supplied request id
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let text = |name: &str| {
            headers
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::trim)
                .filter(|value| !value.is_empty())
        };

        let request_id = text("x-request-id")
            .map(|id| RequestId::from_string(id.to_string()))
            .unwrap_or_else(RequestId::generate);

        let client_ip = text("x-forwarded-for")
            .and_then(|list| list.split(',').next())
            .map(str::trim)
            .or_else(|| text("x-real-ip"))
            .map(str::to_string);

        Self {
            request_id,
            client_ip,
            user_agent: text(header::USER_AGENT.as_str()).map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, response::IntoResponse};

    #[test]
    fn test_request_id_generation() {
        let id1 = RequestId::generate();
        let id2 = RequestId::generate();
        assert_ne!(id1, id2);
        assert!(id1.as_str().starts_with("req_"));
    }

    #[test]
    fn test_request_id_from_string() {
        let id = RequestId::from_string("test_123".to_string());
        assert_eq!(id.as_str(), "test_123");
    }

    #[test]
    fn test_metadata_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", "abc".parse().unwrap());
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );
        headers.insert("x-real-ip", "10.0.0.1".parse().unwrap());
        headers.insert(header::USER_AGENT, "test-agent".parse().unwrap());

        let meta = RequestMetadata::from_headers(&headers);

        assert_eq!(meta.request_id.as_str(), "abc");
        assert_eq!(meta.client_ip.as_deref(), Some("203.0.113.1"));
        assert_eq!(meta.user_agent.as_deref(), Some("test-agent"));
    }

    #[test]
    fn test_metadata_fallbacks() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", "  ".parse().unwrap());
        headers.insert("x-real-ip", "10.0.0.1".parse().unwrap());

        let meta = RequestMetadata::from_headers(&headers);

        assert!(meta.request_id.as_str().starts_with("req_"));
        assert_eq!(meta.client_ip.as_deref(), Some("10.0.0.1"));
        assert!(meta.user_agent.is_none());

        let meta = RequestMetadata::from_headers(&HeaderMap::new());
        assert!(meta.client_ip.is_none());
    }

    #[tokio::test]
    async fn test_ingress_error_response() {
        let response = IngressError(CoreError::InvalidInput).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json, serde_json::json!({"message": "missing search term"}));
    }

    #[tokio::test]
    async fn test_ingress_error_response_with_detail() {
        let err: IngressError =
            CoreError::UpstreamAuthTransport("connection refused".into()).into();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "internal error during authentication");
        assert_eq!(json["error"], "connection refused");
    }
}
