//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "storycraft_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "storycraft_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "storycraft_http_requests_in_flight";

    // Generation job metrics
    pub const JOBS_CREATED_TOTAL: &str = "storycraft_jobs_created_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "storycraft_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "storycraft_jobs_failed_total";

    // Credit metrics
    pub const CREDITS_REFUNDED_TOTAL: &str = "storycraft_credits_refunded_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "storycraft_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a job reserved and created.
pub fn record_job_created(style: &str) {
    let labels = [("style", style.to_string())];
    counter!(names::JOBS_CREATED_TOTAL, &labels).increment(1);
}

/// Record a job completed and settled.
pub fn record_job_completed(style: &str) {
    let labels = [("style", style.to_string())];
    counter!(names::JOBS_COMPLETED_TOTAL, &labels).increment(1);
}

/// Record a job failed, either at submission or during generation.
pub fn record_job_failed(style: &str, reason: &str) {
    let labels = [
        ("style", style.to_string()),
        ("reason", reason.to_string()),
    ];
    counter!(names::JOBS_FAILED_TOTAL, &labels).increment(1);
}

/// Record credits returned to a balance.
pub fn record_credits_refunded(amount: i64) {
    counter!(names::CREDITS_REFUNDED_TOTAL).increment(amount.max(0) as u64);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (remove IDs, etc.).
fn sanitize_path(path: &str) -> String {
    // The one fixed /videos/ subpath that is not a job id
    if path == "/videos/batch" {
        return path.to_string();
    }
    let path = regex_lite::Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .unwrap()
        .replace_all(path, ":job_id");
    // Catch malformed ids too, so label cardinality stays bounded
    let path = regex_lite::Regex::new(r"/videos/[a-zA-Z0-9_.-]+")
        .unwrap()
        .replace_all(&path, "/videos/:job_id");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}
