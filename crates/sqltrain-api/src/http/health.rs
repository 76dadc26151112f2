//! Liveness, readiness, full health, and metrics handlers.

use std::sync::Arc;

use axum::{
    Json,
    body::Body,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use sqltrain_readiness::ReadinessSnapshot;
use sqltrain_telemetry::{MetricsSnapshot, build_sha};
use tracing::{error, warn};

use crate::health::DatabaseHealth;
use crate::http::errors::ApiError;
use crate::state::ApiState;

/// Body returned by `/health/full`.
#[derive(Debug, Serialize)]
pub(crate) struct FullHealthResponse {
    status: &'static str,
    phase: &'static str,
    app: String,
    version: String,
    build_sha: &'static str,
    uptime_ms: u64,
    dependencies: Vec<ReadinessSnapshot>,
    database: DatabaseHealth,
    metrics: MetricsSnapshot,
}

pub(crate) async fn health(State(state): State<Arc<ApiState>>) -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "phase": state.health.phase() }))
}

pub(crate) async fn ready(State(state): State<Arc<ApiState>>) -> Response {
    if state.health.is_ready() {
        (StatusCode::OK, Json(json!({ "status": "ready" }))).into_response()
    } else {
        let phase = state.health.phase();
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "status": "not_ready", "phase": phase })),
        )
            .into_response()
    }
}

pub(crate) async fn health_full(State(state): State<Arc<ApiState>>) -> Response {
    let ready = state.health.is_ready();
    let database = if ready {
        state.health.database().await
    } else {
        DatabaseHealth::Unavailable
    };
    let degraded = !ready || matches!(database, DatabaseHealth::Error { .. });
    if let DatabaseHealth::Error { error } = &database {
        warn!(error = %error, "database health check failed");
    }

    let body = FullHealthResponse {
        status: if degraded { "degraded" } else { "ok" },
        phase: state.health.phase(),
        app: state.app_name.clone(),
        version: state.version.clone(),
        build_sha: build_sha(),
        uptime_ms: u64::try_from(state.uptime().as_millis()).unwrap_or(u64::MAX),
        dependencies: state.health.dependencies(),
        database,
        metrics: state.metrics.snapshot(),
    };
    let status = if degraded {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, Json(body)).into_response()
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.metrics.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )
            .body(Body::from(body))
            .map_err(|err| {
                error!(error = %err, "failed to build metrics response");
                ApiError::internal("failed to build metrics response")
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            Err(ApiError::internal("failed to render metrics"))
        }
    }
}
