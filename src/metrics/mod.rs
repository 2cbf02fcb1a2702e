//! Prometheus metrics for the template service.
//!
//! This module provides metrics for monitoring the service:
//! - Render metrics (renders by operation and outcome, render latency)
//! - Store metrics (stored templates, compile failures)
//! - HTTP API metrics

mod helpers;

pub use helpers::{encode_metrics, HttpMetrics, RenderMetrics, StoreMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram_vec, register_int_counter, register_int_counter_vec, register_int_gauge,
    HistogramVec, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "microtemplate";

lazy_static! {
    // ============================================================================
    // Render Metrics
    // ============================================================================

    /// Renders by operation (render, render_each, evaluate) and outcome
    pub static ref RENDERS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_renders_total", METRIC_PREFIX),
        "Total template renders",
        &["operation", "outcome"]
    ).unwrap();

    /// Render latency by operation
    pub static ref RENDER_LATENCY: HistogramVec = register_histogram_vec!(
        format!("{}_render_latency_seconds", METRIC_PREFIX),
        "Template render latency in seconds",
        &["operation"],
        vec![0.00001, 0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]
    ).unwrap();

    // ============================================================================
    // Store Metrics
    // ============================================================================

    /// Number of compiled templates held by the store
    pub static ref TEMPLATES_STORED: IntGauge = register_int_gauge!(
        format!("{}_templates_stored", METRIC_PREFIX),
        "Number of compiled templates in the store"
    ).unwrap();

    /// Template sources rejected by the compiler
    pub static ref COMPILE_FAILURES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_compile_failures_total", METRIC_PREFIX),
        "Total template compilation failures"
    ).unwrap();

    // ============================================================================
    // HTTP API Metrics
    // ============================================================================

    /// HTTP request counter by endpoint and status
    pub static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_http_requests_total", METRIC_PREFIX),
        "Total HTTP requests",
        &["endpoint", "status"]
    ).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_metrics() {
        // lazy_static registers on first access
        TEMPLATES_STORED.set(1);

        let result = encode_metrics();
        assert!(result.is_ok());
        let output = result.unwrap();
        assert!(output.contains("microtemplate_templates_stored"));
    }

    #[test]
    fn test_render_metrics() {
        let renders = RENDERS_TOTAL.with_label_values(&["render", "ok"]);
        let before = renders.get();
        renders.inc();
        assert!(renders.get() > before);

        let latency = RENDER_LATENCY.with_label_values(&["render"]);
        let observed = latency.get_sample_count();
        latency.observe(0.001);
        assert!(latency.get_sample_count() > observed);

        let failures = COMPILE_FAILURES_TOTAL.get();
        COMPILE_FAILURES_TOTAL.inc();
        assert!(COMPILE_FAILURES_TOTAL.get() > failures);

        let output = encode_metrics().unwrap();
        assert!(output.contains("microtemplate_renders_total"));
        assert!(output.contains("microtemplate_render_latency_seconds"));
    }
}
