use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub static HTTP_REQUESTS_TOTAL: OnceLock<IntCounterVec> = OnceLock::new();
pub static HTTP_REQUEST_DURATION_SECONDS: OnceLock<HistogramVec> = OnceLock::new();

/// Create the process registry and the HTTP collectors. Safe to call more than once.
pub fn init_metrics() -> &'static Registry {
    REGISTRY.get_or_init(|| {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        let request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "path", "status"],
        )
        .expect("metric can be created");

        registry
            .register(Box::new(requests_total.clone()))
            .expect("collector can be registered");
        registry
            .register(Box::new(request_duration.clone()))
            .expect("collector can be registered");

        let _ = HTTP_REQUESTS_TOTAL.set(requests_total);
        let _ = HTTP_REQUEST_DURATION_SECONDS.set(request_duration);

        registry
    })
}

/// Render every registered collector in the Prometheus text format.
pub fn gather() -> String {
    let Some(registry) = REGISTRY.get() else {
        return String::new();
    };

    let mut buffer = Vec::new();
    let encoder = TextEncoder::new();
    if let Err(e) = encoder.encode(&registry.gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
