/// Prometheus metrics for the AI orchestration layer.
///
/// Counters and histograms live in a process-wide registry and are exported in
/// the text exposition format at `GET /metrics`.
///
/// # Example
/// ```no_run
/// use sf_health_analyzer::metrics::ORCHESTRATIONS_TOTAL;
///
/// ORCHESTRATIONS_TOTAL
///     .with_label_values(&["insights", "success"])
///     .inc();
/// ```

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, HistogramOpts, HistogramVec, Opts, Registry};
use std::time::Duration;

use crate::ai::FailureKind;

lazy_static! {
    /// Global Prometheus registry for all metrics
    pub static ref PROMETHEUS_REGISTRY: Registry = Registry::new();

    /// Orchestration calls by outcome
    ///
    /// Labels: operation (categorization|insights), outcome (success or failure classification)
    pub static ref ORCHESTRATIONS_TOTAL: CounterVec = CounterVec::new(
        Opts::new("orchestrations_total", "Total number of AI orchestration calls")
            .namespace("sf_health_analyzer"),
        &["operation", "outcome"]
    ).expect("Failed to create ORCHESTRATIONS_TOTAL metric");

    /// Orchestration duration in seconds, including fallback paths
    ///
    /// Labels: operation
    pub static ref ORCHESTRATION_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "orchestration_duration_seconds",
            "AI orchestration call duration in seconds"
        )
        .namespace("sf_health_analyzer")
        .buckets(vec![0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0]),
        &["operation"]
    ).expect("Failed to create ORCHESTRATION_DURATION_SECONDS metric");

    /// Tool invocations observed in agent streams
    pub static ref AGENT_TOOL_CALLS_TOTAL: Counter = Counter::with_opts(
        Opts::new("agent_tool_calls_total", "Tool invocations observed in agent streams")
            .namespace("sf_health_analyzer")
    ).expect("Failed to create AGENT_TOOL_CALLS_TOTAL metric");

    /// Event-stream records parsed
    pub static ref STREAM_RECORDS_TOTAL: Counter = Counter::with_opts(
        Opts::new("stream_records_total", "Event-stream records parsed")
            .namespace("sf_health_analyzer")
    ).expect("Failed to create STREAM_RECORDS_TOTAL metric");
}

/// Register all metrics with the global registry. Call once at startup.
pub fn init_metrics() -> Result<(), prometheus::Error> {
    PROMETHEUS_REGISTRY.register(Box::new(ORCHESTRATIONS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(ORCHESTRATION_DURATION_SECONDS.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(AGENT_TOOL_CALLS_TOTAL.clone()))?;
    PROMETHEUS_REGISTRY.register(Box::new(STREAM_RECORDS_TOTAL.clone()))?;
    Ok(())
}

/// Record the outcome of one orchestration call
pub fn record_orchestration(operation: &str, failure: Option<FailureKind>, elapsed: Duration) {
    let outcome = failure.as_ref().map_or("success", |kind| kind.as_ref());
    ORCHESTRATIONS_TOTAL
        .with_label_values(&[operation, outcome])
        .inc();
    ORCHESTRATION_DURATION_SECONDS
        .with_label_values(&[operation])
        .observe(elapsed.as_secs_f64());
}

/// Gather all metrics in Prometheus text format
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let metric_families = PROMETHEUS_REGISTRY.gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
        return String::from("# Error encoding metrics\n");
    }

    String::from_utf8(buffer).unwrap_or_else(|e| {
        tracing::error!("Failed to convert metrics to string: {}", e);
        String::from("# Error converting metrics\n")
    })
}
