//! Prometheus metrics for the admin API
//!
//! Complements the in-process [`ApiMetricsCounter`](crate::ApiMetricsCounter):
//! the counter feeds the dashboard, these series feed an external scraper.

use prometheus::{
    Counter, CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry,
};
use std::sync::OnceLock;

/// Global Prometheus registry for RideHub metrics
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

/// Get or initialize the global registry
pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        let r = Registry::new();
        register_metrics(&r);
        r
    })
}

/// HTTP requests by method and status code
pub static HTTP_REQUESTS_TOTAL: OnceLock<CounterVec> = OnceLock::new();

/// HTTP request latency
///
/// Buckets: 5ms, 25ms, 100ms, 250ms, 500ms, 1s, 2s, 5s
pub static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

/// Last observed health severity per service (0 = healthy ... 3 = critical)
pub static HEALTH_STATUS: OnceLock<GaugeVec> = OnceLock::new();

/// Failed system-log batch inserts
pub static LOG_FLUSH_FAILURES_TOTAL: OnceLock<Counter> = OnceLock::new();

/// System-log entries dropped because the channel was full
pub static LOG_ENTRIES_DROPPED_TOTAL: OnceLock<Counter> = OnceLock::new();

fn register<M>(registry: &Registry, slot: &OnceLock<M>, metric: prometheus::Result<M>, name: &str)
where
    M: prometheus::core::Collector + Clone + 'static,
{
    match metric {
        Ok(metric) => {
            if let Err(e) = registry.register(Box::new(metric.clone())) {
                tracing::warn!(metric = name, error = %e, "Failed to register metric");
            }
            slot.set(metric).ok();
        }
        Err(e) => tracing::warn!(metric = name, error = %e, "Failed to create metric"),
    }
}

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    register(
        registry,
        &HTTP_REQUESTS_TOTAL,
        CounterVec::new(
            Opts::new("ridehub_http_requests_total", "Total HTTP requests served"),
            &["method", "status"],
        ),
        "ridehub_http_requests_total",
    );

    register(
        registry,
        &HTTP_REQUEST_DURATION_SECONDS,
        HistogramVec::new(
            HistogramOpts::new("ridehub_http_request_duration_seconds", "HTTP request latency")
                .buckets(vec![0.005, 0.025, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
            &["method"],
        ),
        "ridehub_http_request_duration_seconds",
    );

    register(
        registry,
        &HEALTH_STATUS,
        GaugeVec::new(
            Opts::new(
                "ridehub_health_status",
                "Last health severity per service (0 healthy, 1 warning, 2 error, 3 critical)",
            ),
            &["service"],
        ),
        "ridehub_health_status",
    );

    register(
        registry,
        &LOG_FLUSH_FAILURES_TOTAL,
        Counter::with_opts(Opts::new(
            "ridehub_system_log_flush_failures_total",
            "Failed system log batch inserts",
        )),
        "ridehub_system_log_flush_failures_total",
    );

    register(
        registry,
        &LOG_ENTRIES_DROPPED_TOTAL,
        Counter::with_opts(Opts::new(
            "ridehub_system_log_entries_dropped_total",
            "System log entries dropped on a full channel",
        )),
        "ridehub_system_log_entries_dropped_total",
    );
}

/// Record a completed HTTP request
pub fn observe_http_request(method: &str, status: u16, duration_secs: f64) {
    registry();
    if let Some(counter) = HTTP_REQUESTS_TOTAL.get() {
        let status = status.to_string();
        counter.with_label_values(&[method, status.as_str()]).inc();
    }
    if let Some(histogram) = HTTP_REQUEST_DURATION_SECONDS.get() {
        histogram.with_label_values(&[method]).observe(duration_secs);
    }
}

/// Record the latest severity rank for a service
pub fn set_health_status(service: &str, rank: u8) {
    registry();
    if let Some(gauge) = HEALTH_STATUS.get() {
        gauge.with_label_values(&[service]).set(f64::from(rank));
    }
}

pub fn inc_log_flush_failure() {
    registry();
    if let Some(counter) = LOG_FLUSH_FAILURES_TOTAL.get() {
        counter.inc();
    }
}

pub fn inc_log_entries_dropped() {
    registry();
    if let Some(counter) = LOG_ENTRIES_DROPPED_TOTAL.get() {
        counter.inc();
    }
}

/// Get metrics in Prometheus text format
pub fn metrics_text() -> String {
    use prometheus::{Encoder, TextEncoder};

    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
