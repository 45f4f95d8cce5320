//! Prometheus metrics
//!
//! The recorder is installed once by the binary. Without it the `metrics`
//! macros are no-ops and `/metrics` renders an empty body.

use std::time::{Duration, Instant};

use assistant_core::ErrorKind;
use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::state::AppState;

/// Install the global Prometheus recorder
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

pub fn record_request(endpoint: &str, method: &str, status: u16, elapsed: Duration) {
    metrics::counter!(
        "assistant_requests_total",
        "endpoint" => endpoint.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!(
        "assistant_request_duration_seconds",
        "endpoint" => endpoint.to_string()
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_error(kind: ErrorKind) {
    metrics::counter!("assistant_errors_total", "kind" => kind.as_str()).increment(1);
}

/// Route-layer middleware recording count and latency per matched route
pub async fn track_metrics(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_owned());
    let method = request.method().to_string();

    let response = next.run(request).await;

    record_request(&endpoint, &method, response.status().as_u16(), start.elapsed());
    response
}

/// `GET /metrics`
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let body = state
        .metrics
        .as_ref()
        .map(PrometheusHandle::render)
        .unwrap_or_default();
    (
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4",
        )],
        body,
    )
}
