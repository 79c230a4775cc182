//! End-to-end test harness for the Olho Vivo proxy
//!
//! Wires the ingress router, the real egress connector and the observability endpoints
//! together against a wiremock upstream that mimics the `/v2.1` API layout.

use axum::{Router, body::Body, http::Request, middleware, response::Response};
use olhovivo_core::ApiToken;
use olhovivo_egress::olhovivo::{OlhoVivoConfig, OlhoVivoConnector};
use olhovivo_ingress::{
    BuscarState,
    middleware::{cors_middleware, request_context_middleware, security_headers_middleware},
    router,
};
use olhovivo_observability::{HealthState, Metrics, health_router};
use std::sync::Arc;
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path, query_param},
};

/// Token the mocked upstream accepts
pub const TEST_TOKEN: &str = "e2e-secret-token";

/// Session cookie issued by the mocked upstream
pub const TEST_COOKIE: &str = "apiCredentials=e2e-session";

pub const AUTH_PATH: &str = "/v2.1/Login/Autenticar";
pub const SEARCH_PATH: &str = "/v2.1/Linha/Buscar";

/// Base URL of the mocked upstream, including the version segment
pub fn base_url(mock_server: &MockServer) -> String {
    format!("{}/v2.1", mock_server.uri())
}

/// Mount an authentication endpoint that accepts `TEST_TOKEN`
pub async fn mount_auth_success(mock_server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(AUTH_PATH))
        .and(query_param("token", TEST_TOKEN))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", format!("{}; path=/; HttpOnly", TEST_COOKIE))
                .set_body_string("true"),
        )
        .expect(expected_calls)
        .mount(mock_server)
        .await;
}

/// Mount an authentication endpoint that answers the given body without a cookie
pub async fn mount_auth_rejection(mock_server: &MockServer, body: &str, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(AUTH_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .expect(expected_calls)
        .mount(mock_server)
        .await;
}

/// Mount a search endpoint answering `response` for requests carrying the session cookie
pub async fn mount_search(
    mock_server: &MockServer,
    response: ResponseTemplate,
    expected_calls: u64,
) {
    Mock::given(method("GET"))
        .and(path(SEARCH_PATH))
        .and(wiremock::matchers::header("cookie", TEST_COOKIE))
        .respond_with(response)
        .expect(expected_calls)
        .mount(mock_server)
        .await;
}

/// Build the application the server runs, pointed at `base_url`
pub fn build_app(base_url: &str, token: Option<&str>) -> (Router, Arc<Metrics>) {
    let metrics = Arc::new(Metrics::new().expect("metrics registry"));
    let connector = OlhoVivoConnector::new(OlhoVivoConfig::new().with_base_url(base_url))
        .expect("connector for mock upstream");

    let state = Arc::new(
        BuscarState::new(token.and_then(ApiToken::new), Arc::new(connector))
            .with_metrics(metrics.clone()),
    );
    let health_state = HealthState::new(metrics.clone()).with_readiness(state.clone());

    let app = router(state)
        .merge(health_router(health_state))
        .layer(middleware::from_fn(cors_middleware))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(request_context_middleware));

    (app, metrics)
}

/// Build the application against a mock upstream
pub fn app_for(mock_server: &MockServer, token: Option<&str>) -> Router {
    build_app(&base_url(mock_server), token).0
}

/// Send a GET request through the app
pub async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(
            Request::builder()
                .uri(uri)
                .body(Body::empty())
                .expect("valid request"),
        )
        .await
        .expect("infallible router")
}

/// Read a response body as JSON
pub async fn json_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    serde_json::from_slice(&body).expect("JSON body")
}

/// Read a response body as text
pub async fn text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    String::from_utf8_lossy(&body).into_owned()
}
