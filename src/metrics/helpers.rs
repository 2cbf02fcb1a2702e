//! Metrics helper structs for convenient metric recording

use std::time::Instant;

use prometheus::{Encoder, TextEncoder};

use super::{
    COMPILE_FAILURES_TOTAL, HTTP_REQUESTS_TOTAL, RENDERS_TOTAL, RENDER_LATENCY, TEMPLATES_STORED,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording render metrics
pub struct RenderMetrics;

impl RenderMetrics {
    /// Record one finished render started at `started`
    pub fn record(operation: &str, started: Instant, success: bool) {
        let outcome = if success { "ok" } else { "error" };
        RENDERS_TOTAL
            .with_label_values(&[operation, outcome])
            .inc();
        RENDER_LATENCY
            .with_label_values(&[operation])
            .observe(started.elapsed().as_secs_f64());
    }
}

/// Helper struct for recording template store metrics
pub struct StoreMetrics;

impl StoreMetrics {
    /// Set the number of stored templates
    pub fn set_stored(count: usize) {
        TEMPLATES_STORED.set(count as i64);
    }

    /// Record a template source that failed to compile
    pub fn record_compile_failure() {
        COMPILE_FAILURES_TOTAL.inc();
    }
}

/// Helper struct for recording HTTP metrics
pub struct HttpMetrics;

impl HttpMetrics {
    pub fn record_request(endpoint: &str, status: u16) {
        let status = status.to_string();
        HTTP_REQUESTS_TOTAL
            .with_label_values(&[endpoint, status.as_str()])
            .inc();
    }
}
