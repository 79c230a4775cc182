//! Metrics collection with Prometheus
//!
//! This module provides Prometheus metrics for the proxy:
//! - Request counts by outcome (`success` or an error kind)
//! - End-to-end request latency
//! - Upstream call latency per step (`authenticate`, `search`)

use prometheus::{CounterVec, Histogram, HistogramOpts, HistogramVec, Opts, Registry};
use std::sync::Arc;

/// Metrics collector for the proxy
#[derive(Clone)]
pub struct Metrics {
    /// Prometheus registry
    registry: Arc<Registry>,

    /// Handled requests, labelled by outcome
    pub requests_total: CounterVec,

    /// Total request duration (end-to-end)
    pub request_duration_seconds: Histogram,

    /// Upstream call duration, labelled by step
    pub upstream_duration_seconds: HistogramVec,

    /// Upstream calls, labelled by step and result
    pub upstream_calls_total: CounterVec,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = CounterVec::new(
            Opts::new("olhovivo_requests_total", "Total number of search requests"),
            &["outcome"],
        )?;

        let request_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "olhovivo_request_duration_seconds",
                "Search request duration in seconds",
            )
            .buckets(vec![0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0]),
        )?;

        let upstream_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "olhovivo_upstream_duration_seconds",
                "Upstream call duration in seconds",
            )
            .buckets(vec![0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 15.0]),
            &["step"],
        )?;

        let upstream_calls_total = CounterVec::new(
            Opts::new(
                "olhovivo_upstream_calls_total",
                "Total number of upstream calls",
            ),
            &["step", "result"],
        )?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(upstream_duration_seconds.clone()))?;
        registry.register(Box::new(upstream_calls_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            requests_total,
            request_duration_seconds,
            upstream_duration_seconds,
            upstream_calls_total,
        })
    }

    /// Get the Prometheus registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Record a handled request
    pub fn record_request(&self, outcome: &str, duration_secs: f64) {
        self.requests_total.with_label_values(&[outcome]).inc();
        self.request_duration_seconds.observe(duration_secs);
    }

    /// Record one upstream call
    pub fn record_upstream_call(&self, step: &str, result: &str, duration_secs: f64) {
        self.upstream_calls_total
            .with_label_values(&[step, result])
            .inc();
        self.upstream_duration_seconds
            .with_label_values(&[step])
            .observe(duration_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("success", 0.2);
        assert!(!metrics.registry().gather().is_empty());
    }

    #[test]
    fn test_record_request() {
        let metrics = Metrics::new().unwrap();
        metrics.record_request("success", 0.1);
        metrics.record_request("success", 0.3);
        metrics.record_request("upstream_auth_failed", 0.05);

        assert_eq!(
            metrics.requests_total.with_label_values(&["success"]).get(),
            2.0
        );
        assert_eq!(
            metrics
                .requests_total
                .with_label_values(&["upstream_auth_failed"])
                .get(),
            1.0
        );
        assert_eq!(metrics.request_duration_seconds.get_sample_count(), 3);
    }

    #[test]
    fn test_record_upstream_call() {
        let metrics = Metrics::new().unwrap();
        metrics.record_upstream_call("authenticate", "ok", 0.08);
        metrics.record_upstream_call("search", "error", 0.4);

        assert_eq!(
            metrics
                .upstream_calls_total
                .with_label_values(&["authenticate", "ok"])
                .get(),
            1.0
        );
        assert_eq!(
            metrics
                .upstream_duration_seconds
                .with_label_values(&["search"])
                .get_sample_count(),
            1
        );
    }

    #[test]
    fn test_independent_registries() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record_request("success", 0.1);
        assert_eq!(b.requests_total.with_label_values(&["success"]).get(), 0.0);
    }
}
