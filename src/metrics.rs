use axum::{routing::get, Router};
use metrics::{describe_counter, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder, register the pipeline counters,
    /// and publish the configured confidence threshold as a static gauge.
    pub fn init(confidence_threshold: f32) -> Self {
        let builder = PrometheusBuilder::new();

        let handle = builder
            .install_recorder()
            .expect("prometheus: install recorder");

        describe_counter!("fir_requests_total", "FIR analysis requests accepted");
        describe_counter!(
            "fir_deferred_total",
            "Requests where labeling deferred to the LLM"
        );
        describe_counter!(
            "fir_gateway_failures_total",
            "LLM gateway sub-call failures"
        );
        gauge!("fir_confidence_threshold").set(confidence_threshold as f64);

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
