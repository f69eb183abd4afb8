//! Prometheus request metrics, served on `GET /metrics`.

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::time::Duration;

pub const METRICS_PATH: &str = "/metrics";

/// Endpoint label for requests that matched no route.
pub const UNMATCHED_ENDPOINT: &str = "NOT_FOUND";

/// Request counters and latencies, registered on a registry owned by this value.
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    http_requests: IntCounterVec,
    http_request_duration: HistogramVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let app_info = IntGauge::with_opts(
            Opts::new("app_info", "Application information")
                .const_label("name", env!("CARGO_PKG_NAME"))
                .const_label("version", env!("CARGO_PKG_VERSION")),
        )?;
        app_info.set(1);
        registry.register(Box::new(app_info))?;

        let http_requests = IntCounterVec::new(
            Opts::new("http_requests_total", "Service request count"),
            &["method", "endpoint", "http_status"],
        )?;
        registry.register(Box::new(http_requests.clone()))?;

        let http_request_duration = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "Request latency in seconds",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ]),
            &["method", "endpoint"],
        )?;
        registry.register(Box::new(http_request_duration.clone()))?;

        Ok(Self {
            registry,
            http_requests,
            http_request_duration,
        })
    }

    /// `endpoint` is the route template (e.g. `/v1/texts/key/:key`), not the
    /// concrete path, so label cardinality stays bounded.
    pub fn record_request(&self, method: &str, endpoint: &str, status: u16, latency: Duration) {
        self.http_requests
            .with_label_values(&[method, endpoint, &status.to_string()])
            .inc();
        self.http_request_duration
            .with_label_values(&[method, endpoint])
            .observe(latency.as_secs_f64());
    }

    /// Text exposition format, with its content type.
    pub fn encode(&self) -> Result<(String, Vec<u8>), prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}
