//! Line search endpoint
//!
//! `GET /api/buscar?termos=<text>` authenticates against Olho Vivo with the configured
//! token, forwards the search with the fresh session cookie and relays the JSON array
//! unchanged. Every request performs its own authentication; no session is shared
//! between requests.

use crate::types::{IngressError, IngressResult, RequestMetadata};
use axum::{
    Extension, Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
    routing::get,
};
use olhovivo_core::{ApiToken, Error as CoreError, SearchQuery, TransitApi};
use olhovivo_observability::{Metrics, ReadinessChecker, UpstreamReadiness};
use serde::Deserialize;
use std::{sync::Arc, time::Instant};
use tracing::{debug, error, info, warn};

/// Cache directive attached to successful search responses
pub const CACHE_CONTROL_VALUE: &str = "s-maxage=60, stale-while-revalidate=120";

/// Query parameters accepted by the search endpoint
#[derive(Debug, Deserialize)]
pub struct BuscarParams {
    pub termos: Option<String>,
}

/// Shared state for the search endpoint
pub struct BuscarState {
    api_token: Option<ApiToken>,
    upstream: Arc<dyn TransitApi>,
    metrics: Option<Arc<Metrics>>,
    log_requests: bool,
}

impl BuscarState {
    /// Create state from the configured token and upstream client
    pub fn new(api_token: Option<ApiToken>, upstream: Arc<dyn TransitApi>) -> Self {
        Self {
            api_token,
            upstream,
            metrics: None,
            log_requests: false,
        }
    }

    /// Record request and upstream metrics
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Log one INFO line per completed search
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.log_requests = enabled;
        self
    }

    fn record_upstream(&self, step: &str, ok: bool, started: Instant) {
        if let Some(metrics) = &self.metrics {
            let result = if ok { "ok" } else { "error" };
            metrics.record_upstream_call(step, result, started.elapsed().as_secs_f64());
        }
    }

    async fn run_search(&self, termos: Option<&str>) -> olhovivo_core::Result<serde_json::Value> {
        let Some(token) = &self.api_token else {
            return Err(CoreError::ConfigurationMissing);
        };

        let query = SearchQuery::parse(termos)?;
        debug!(query = %query, "Searching lines");

        let started = Instant::now();
        let session = self.upstream.authenticate(token).await;
        self.record_upstream("authenticate", session.is_ok(), started);
        let session = session?;

        let started = Instant::now();
        let lines = self.upstream.search_lines(&session, &query).await;
        self.record_upstream("search", lines.is_ok(), started);
        lines
    }
}

impl ReadinessChecker for BuscarState {
    fn readiness(&self) -> UpstreamReadiness {
        UpstreamReadiness {
            base_url: self.upstream.endpoint().map(str::to_string),
            token_configured: self.api_token.is_some(),
        }
    }
}

/// Create the search router
///
/// Accepts an owned state or an `Arc` already shared with the readiness probe.
pub fn router(state: impl Into<Arc<BuscarState>>) -> Router {
    Router::new()
        .route("/api/buscar", get(buscar))
        .with_state(state.into())
}

/// Search handler
async fn buscar(
    State(state): State<Arc<BuscarState>>,
    metadata: Option<Extension<RequestMetadata>>,
    params: Result<Query<BuscarParams>, QueryRejection>,
) -> IngressResult<Response> {
    let started = Instant::now();

    // A query string that cannot be decoded counts as a missing term
    let termos = match &params {
        Ok(Query(params)) => params.termos.as_deref(),
        Err(rejection) => {
            debug!(error = %rejection, "Rejected query string");
            None
        }
    };

    let result = state.run_search(termos).await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(err) => err.kind(),
    };
    let elapsed = started.elapsed();
    if let Some(metrics) = &state.metrics {
        metrics.record_request(outcome, elapsed.as_secs_f64());
    }
    if state.log_requests {
        let metadata = metadata.as_ref().map(|Extension(metadata)| metadata);
        info!(
            termos = termos.unwrap_or(""),
            client_ip = metadata.and_then(|m| m.client_ip.as_deref()).unwrap_or("-"),
            user_agent = metadata.and_then(|m| m.user_agent.as_deref()).unwrap_or("-"),
            outcome,
            elapsed_ms = elapsed.as_millis() as u64,
            "Search completed"
        );
    }

    match result {
        Ok(lines) => {
            let mut response = Json(lines).into_response();
            response.headers_mut().insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static(CACHE_CONTROL_VALUE),
            );
            Ok(response)
        }
        Err(err) => {
            log_failure(&err);
            Err(IngressError(err))
        }
    }
}

fn log_failure(err: &CoreError) {
    match err {
        CoreError::ConfigurationMissing => {
            error!("SPTRANS_API_KEY is not configured; refusing search");
        }
        CoreError::InvalidInput => {
            warn!("Search request without a term");
        }
        CoreError::UpstreamAuthFailed {
            body,
            cookie_present,
        } => {
            warn!(
                upstream_body = %body,
                cookie_present = *cookie_present,
                "Olho Vivo rejected authentication"
            );
        }
        CoreError::UpstreamAuthTransport(detail) => {
            error!(error = %detail, "Authentication request failed");
        }
        CoreError::UpstreamSearchHttp { status, reason } => {
            warn!(
                status = *status,
                reason = reason.as_deref().unwrap_or(""),
                "Olho Vivo search returned an error status"
            );
        }
        CoreError::UpstreamSearchMalformed { preview } => {
            warn!(
                body_preview = %preview,
                "Olho Vivo search returned non-JSON data"
            );
        }
        CoreError::UpstreamSearchTransport(detail) => {
            error!(error = %detail, "Search request failed");
        }
    }
}
