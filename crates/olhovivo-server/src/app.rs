//! Application assembly: connector, handler state, health endpoints and middleware

use crate::config::ServerConfig;
use anyhow::Context;
use axum::{Router, middleware};
use olhovivo_egress::{
    client::HttpClientConfig,
    olhovivo::{OlhoVivoConfig, OlhoVivoConnector},
};
use olhovivo_ingress::{
    BuscarState,
    middleware::{cors_middleware, request_context_middleware, security_headers_middleware},
    router,
};
use olhovivo_observability::{HealthState, Metrics, health_router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Build the full application router from configuration
pub fn build_app(config: &ServerConfig, metrics: Arc<Metrics>) -> anyhow::Result<Router> {
    let api_token = config.api_token();
    if api_token.is_none() {
        warn!("⚠️  No upstream token configured (set SPTRANS_API_KEY); searches answer 500");
    }

    let client_config = HttpClientConfig {
        timeout_secs: config.upstream.timeout_secs,
        connect_timeout_secs: config.upstream.connect_timeout_secs,
        ..HttpClientConfig::default()
    };
    let connector = OlhoVivoConnector::new(
        OlhoVivoConfig::new()
            .with_base_url(config.upstream.base_url.clone())
            .with_client_config(client_config),
    )
    .context("Failed to create Olho Vivo connector")?;
    info!("🚌 Olho Vivo upstream: {}", connector.base_url());

    let state = Arc::new(
        BuscarState::new(api_token, Arc::new(connector))
            .with_metrics(metrics.clone())
            .with_request_logging(config.logging.log_requests),
    );

    let health_state = HealthState::new(metrics).with_readiness(state.clone());

    let mut app = router(state)
        .merge(health_router(health_state))
        .layer(TraceLayer::new_for_http());

    if config.cors.enabled {
        app = app.layer(middleware::from_fn(cors_middleware));
    }

    Ok(app
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_context_middleware)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use tower::ServiceExt;

    fn config_without_token() -> ServerConfig {
        let mut config = ServerConfig::default();
        // Port 9 (discard) is never contacted: the handler stops before any upstream call
        config.upstream.base_url = "http://127.0.0.1:9/v2.1".to_string();
        config
    }

    fn metrics() -> Arc<Metrics> {
        Arc::new(Metrics::new().unwrap())
    }

    #[tokio::test]
    async fn test_unconfigured_app_reports_not_ready() {
        let app = build_app(&config_without_token(), metrics()).unwrap();

        let response = app
            .oneshot(Request::builder().uri("/readyz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unconfigured_app_rejects_search() {
        let app = build_app(&config_without_token(), metrics()).unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/buscar?termos=lapa")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(response.headers().get("x-request-id").is_some());
        assert!(response.headers().get("x-content-type-options").is_some());

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "server not configured");
    }

    #[tokio::test]
    async fn test_cors_can_be_disabled() {
        let mut config = config_without_token();
        config.cors.enabled = false;
        let app = build_app(&config, metrics()).unwrap();

        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_cors_enabled_by_default() {
        let app = build_app(&config_without_token(), metrics()).unwrap();

        let response = app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "*"
        );
    }

    #[test]
    fn test_invalid_base_url_fails() {
        let mut config = config_without_token();
        config.upstream.base_url = "ftp://example.com".to_string();
        assert!(build_app(&config, metrics()).is_err());
    }

    #[test]
    fn test_zero_timeout_fails() {
        let mut config = config_without_token();
        config.upstream.timeout_secs = 0;
        assert!(build_app(&config, metrics()).is_err());
    }
}
