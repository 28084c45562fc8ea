//! Health check handlers
//!
//! Author: hephaex@gmail.com

use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Health check response
#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub build_info: BuildInfo,
}

#[derive(Serialize, ToSchema)]
pub struct BuildInfo {
    pub name: String,
    pub storage: String,
}

/// Liveness probe - basic health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is alive", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build_info: BuildInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            storage: state.backend().to_string(),
        },
    })
}

/// Readiness response
#[derive(Serialize, ToSchema)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub checks: ReadinessChecks,
}

#[derive(Serialize, ToSchema)]
pub struct ReadinessChecks {
    /// Database reachable (always true on the in-memory store)
    pub database: bool,
}

/// Readiness probe - checks dependencies
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Service is ready", body = ReadinessResponse),
        (status = 503, description = "Service not ready", body = ReadinessResponse)
    )
)]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let database = match &state.database {
        Some(store) => store.ping().await,
        None => true,
    };
    let ready = state.is_ready() && database;

    let response = ReadinessResponse {
        ready,
        checks: ReadinessChecks { database },
    };

    if ready {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}

/// Prometheus-compatible metrics endpoint
///
/// Request metrics from the default registry followed by server gauges.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&prometheus::gather(), &mut buffer)
        .map_err(|e| AppError::Internal(format!("Failed to encode metrics: {e}")))?;
    let mut output = String::from_utf8(buffer)
        .map_err(|e| AppError::Internal(format!("Metrics are not UTF-8: {e}")))?;

    let uptime = state.uptime_secs();
    let total_requests = state.get_request_count();
    let sessions = state.auth.sessions().active_sessions().await;

    output.push_str("# HELP status_uptime_seconds Time since server start\n");
    output.push_str("# TYPE status_uptime_seconds gauge\n");
    output.push_str(&format!("status_uptime_seconds {uptime}\n"));

    output.push_str("# HELP status_requests_total Total number of HTTP requests\n");
    output.push_str("# TYPE status_requests_total counter\n");
    output.push_str(&format!("status_requests_total {total_requests}\n"));

    output.push_str("# HELP status_sessions_active Open login sessions\n");
    output.push_str("# TYPE status_sessions_active gauge\n");
    output.push_str(&format!("status_sessions_active {sessions}\n"));

    output.push_str("# HELP status_build_info Build information\n");
    output.push_str("# TYPE status_build_info gauge\n");
    output.push_str(&format!(
        "status_build_info{{version=\"{}\",storage=\"{}\"}} 1\n",
        env!("CARGO_PKG_VERSION"),
        state.backend()
    ));

    Ok((
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        output,
    ))
}
