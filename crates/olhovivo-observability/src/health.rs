//! Liveness, readiness and metrics endpoints
//!
//! `/readyz` only inspects local configuration: whether an upstream token is set and
//! which base URL searches go to. It never calls the upstream, so probes cost no quota.

use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::{Encoder, TEXT_FORMAT, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;

use crate::metrics::Metrics;

/// What the proxy knows about its upstream without contacting it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamReadiness {
    /// Base URL searches are sent to, when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub token_configured: bool,
}

impl UpstreamReadiness {
    /// Searches can only succeed with a token
    pub fn is_ready(&self) -> bool {
        self.token_configured
    }
}

/// Source of the upstream readiness report
pub trait ReadinessChecker: Send + Sync {
    fn readiness(&self) -> UpstreamReadiness;
}

/// Shared state of the health router
#[derive(Clone)]
pub struct HealthState {
    metrics: Arc<Metrics>,
    readiness: Option<Arc<dyn ReadinessChecker>>,
}

impl HealthState {
    /// Health state without a readiness source; `/readyz` then always answers ready
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            metrics,
            readiness: None,
        }
    }

    pub fn with_readiness(mut self, checker: Arc<dyn ReadinessChecker>) -> Self {
        self.readiness = Some(checker);
        self
    }
}

#[derive(Serialize)]
struct Liveness {
    status: &'static str,
    version: &'static str,
}

#[derive(Serialize)]
struct ReadinessReport {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    upstream: Option<UpstreamReadiness>,
}

/// Create the `/healthz`, `/readyz` and `/metrics` router
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn healthz() -> Json<Liveness> {
    Json(Liveness {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn readyz(State(state): State<HealthState>) -> Response {
    let upstream = state.readiness.as_ref().map(|checker| checker.readiness());
    let ready = upstream.as_ref().is_none_or(UpstreamReadiness::is_ready);

    let (status, label) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        status,
        Json(ReadinessReport {
            status: label,
            upstream,
        }),
    )
        .into_response()
}

async fn metrics_handler(State(state): State<HealthState>) -> Response {
    let mut buffer = Vec::new();
    if let Err(err) = TextEncoder::new().encode(&state.metrics.registry().gather(), &mut buffer) {
        error!("Failed to encode metrics: {}", err);
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }

    ([(header::CONTENT_TYPE, TEXT_FORMAT)], buffer).into_response()
}
