//! Prometheus metrics for Bindgate
//!
//! Exposes metrics at `/metrics` endpoint in Prometheus format.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use bindgate_core::VerificationOutcome;

/// Metric names
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "bindgate_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "bindgate_http_request_duration_seconds";

    // Login metrics
    pub const LOGIN_REQUESTS_TOTAL: &str = "bindgate_login_requests_total";
    pub const VERIFY_DURATION_SECONDS: &str = "bindgate_verify_duration_seconds";
    pub const VERIFY_TIMEOUTS_TOTAL: &str = "bindgate_verify_timeouts_total";

    // System metrics
    pub const UPTIME_SECONDS: &str = "bindgate_uptime_seconds";
    pub const INFO: &str = "bindgate_info";
}

/// Label for a login that never reached the verifier
pub const BAD_REQUEST_LABEL: &str = "bad_request";

/// Metrics recorder
#[derive(Clone)]
pub struct MetricsRecorder {
    handle: PrometheusHandle,
    start_time: Instant,
}

impl MetricsRecorder {
    /// Install the process-wide Prometheus recorder
    pub fn install() -> Result<Self, BuildError> {
        let handle = PrometheusBuilder::new().install_recorder()?;

        gauge!(names::INFO, "version" => bindgate_core::VERSION).set(1.0);

        Ok(Self::with_handle(handle))
    }

    /// Render through a recorder installed elsewhere, either globally or as
    /// the thread's local default.
    pub fn with_handle(handle: PrometheusHandle) -> Self {
        Self {
            handle,
            start_time: Instant::now(),
        }
    }

    /// Get metrics output in Prometheus format
    pub fn render(&self) -> String {
        gauge!(names::UPTIME_SECONDS).set(self.start_time.elapsed().as_secs_f64());

        self.handle.render()
    }

    /// Record an HTTP request
    pub fn record_http_request(&self, method: &str, status: u16, duration_secs: f64) {
        let status_class = format!("{}xx", status / 100);

        counter!(
            names::HTTP_REQUESTS_TOTAL,
            "method" => method.to_string(),
            "status" => status.to_string(),
            "status_class" => status_class
        )
        .increment(1);

        histogram!(
            names::HTTP_REQUEST_DURATION_SECONDS,
            "method" => method.to_string()
        )
        .record(duration_secs);
    }

    /// Record the outcome of one verification
    pub fn record_verification(&self, outcome: VerificationOutcome, duration_secs: f64) {
        counter!(names::LOGIN_REQUESTS_TOTAL, "outcome" => outcome.as_str()).increment(1);
        histogram!(names::VERIFY_DURATION_SECONDS, "outcome" => outcome.as_str())
            .record(duration_secs);
    }

    /// Record a login rejected before verification
    pub fn record_bad_request(&self) {
        counter!(names::LOGIN_REQUESTS_TOTAL, "outcome" => BAD_REQUEST_LABEL).increment(1);
    }

    /// Record a verification abandoned at the deadline
    pub fn record_timeout(&self) {
        counter!(names::VERIFY_TIMEOUTS_TOTAL).increment(1);
    }
}

/// Axum middleware for recording HTTP metrics
pub async fn metrics_middleware(
    State(metrics): State<Arc<MetricsRecorder>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();

    metrics.record_http_request(&method, status, duration);

    debug!(
        method = %method,
        path = %path,
        status = %status,
        duration_ms = %(duration * 1000.0),
        "Request completed"
    );

    response
}

/// Handler for /metrics endpoint
pub async fn metrics_handler(State(metrics): State<Arc<MetricsRecorder>>) -> impl IntoResponse {
    let output = metrics.render();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        output,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorded_metrics_are_rendered() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let metrics = MetricsRecorder::with_handle(recorder.handle());
        let _guard = ::metrics::set_default_local_recorder(&recorder);

        metrics.record_verification(VerificationOutcome::Authenticated, 0.01);
        metrics.record_verification(VerificationOutcome::Authenticated, 0.02);
        metrics.record_verification(VerificationOutcome::InvalidCredential, 0.01);
        metrics.record_bad_request();
        metrics.record_timeout();
        metrics.record_http_request("POST", 401, 0.002);

        let output = metrics.render();
        assert!(output.contains(r#"bindgate_login_requests_total{outcome="authenticated"} 2"#));
        assert!(output.contains(r#"bindgate_login_requests_total{outcome="invalid_credential"} 1"#));
        assert!(output.contains(r#"bindgate_login_requests_total{outcome="bad_request"} 1"#));
        assert!(output.contains("bindgate_verify_timeouts_total 1"));
        assert!(output.contains("bindgate_http_requests_total{"));
        assert!(output.contains(r#"status_class="4xx""#));
        assert!(output.contains("bindgate_uptime_seconds"));
    }
}
