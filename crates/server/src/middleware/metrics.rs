//! Prometheus metrics collection middleware
//!
//! Records `http_requests_total` (counter) and `http_request_duration_seconds`
//! (histogram) for every request, with method/path/status labels.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Collapse per-session path segments so session ids don't become labels.
fn normalize_path(path: &str) -> String {
    let segments: Vec<&str> = path.split('/').collect();
    segments
        .iter()
        .enumerate()
        .map(|(i, seg)| {
            let after_logs = i > 0 && segments[i - 1] == "logs";
            if after_logs || uuid::Uuid::try_parse(seg).is_ok() {
                ":id"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Middleware that records request count and duration metrics.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    let start = Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed().as_secs_f64();

    let status = response.status().as_u16().to_string();

    metrics::counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status
    )
    .increment(1);

    metrics::histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path
    )
    .record(duration);

    response
}

#[cfg(test)]
mod tests {
    use super::normalize_path;

    #[test]
    fn session_ids_are_collapsed() {
        assert_eq!(normalize_path("/logs/my-session"), "/logs/:id");
        assert_eq!(normalize_path("/api/logs/abc"), "/api/logs/:id");
        assert_eq!(
            normalize_path("/x/0b8f7a3e-3f0c-4a51-9d7a-2a1c9e0d4b11"),
            "/x/:id"
        );
        assert_eq!(normalize_path("/api/message"), "/api/message");
    }
}
