//! Metrics tracking middleware
//!
//! Tracks request counts, latency and status codes as Prometheus metrics
//! in the default registry, exported by `GET /metrics`.
//!
//! Author: hephaex@gmail.com

use crate::state::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use lazy_static::lazy_static;
use prometheus::{register_histogram_vec, register_int_counter_vec, HistogramVec, IntCounterVec};
use std::sync::Arc;
use std::time::Instant;

lazy_static! {
    static ref HTTP_REQUESTS_TOTAL: IntCounterVec = register_int_counter_vec!(
        "http_requests_total",
        "Total HTTP requests by method, endpoint and status",
        &["method", "endpoint", "status"]
    )
    .expect("metric can be registered");
    static ref HTTP_REQUEST_DURATION: HistogramVec = register_histogram_vec!(
        "http_request_duration_seconds",
        "HTTP request latency in seconds",
        &["method", "endpoint"]
    )
    .expect("metric can be registered");
}

/// Metrics tracking middleware
pub async fn metrics_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let endpoint = normalize_endpoint(request.uri().path());

    let response = next.run(request).await;

    state.increment_requests();
    let status = response.status().as_u16().to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &endpoint, &status])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &endpoint])
        .observe(start.elapsed().as_secs_f64());

    response
}

/// Normalize endpoint paths for consistent metrics
///
/// Replaces id segments and usernames with placeholders so label
/// cardinality stays bounded.
fn normalize_endpoint(path: &str) -> String {
    let mut previous = "";
    let normalized: Vec<&str> = path
        .split('/')
        .map(|seg| {
            let out = if is_uuid(seg) || is_numeric(seg) {
                ":id"
            } else if previous == "user" && !seg.is_empty() {
                ":username"
            } else {
                seg
            };
            previous = seg;
            out
        })
        .collect();

    normalized.join("/")
}

/// Check if a string looks like a UUID
fn is_uuid(s: &str) -> bool {
    s.len() == 36
        && s.chars().enumerate().all(|(i, c)| match i {
            8 | 13 | 18 | 23 => c == '-',
            _ => c.is_ascii_hexdigit(),
        })
}

/// Check if a string is numeric (likely an ID)
fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}
