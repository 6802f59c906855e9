//! Health, info, and metrics endpoints.

use std::sync::Arc;
use std::time::Duration;

use axum::{Json, body::Body, extract::State, http::StatusCode, response::Response};
use chrono::{SecondsFormat, Utc};
use lovebrew_telemetry::{build_sha, record_app_mode};
use tracing::{error, warn};

use crate::http::errors::ApiError;
use crate::models::{HealthResponse, InfoResponse};
use crate::state::ApiState;

pub(crate) async fn info(State(state): State<Arc<ApiState>>) -> Json<InfoResponse> {
    Json(InfoResponse {
        server_time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        deployed_time: state.deployed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        uptime: format_uptime(state.uptime()),
        version: env!("CARGO_PKG_VERSION").to_string(),
        build: build_sha().to_string(),
    })
}

pub(crate) async fn health(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    record_app_mode(state.config.mode.as_str());
    let missing_resources: Vec<String> = state
        .orchestrator
        .resources()
        .missing()
        .await
        .iter()
        .map(|path| path.display().to_string())
        .collect();
    let degraded = !state.tools.is_complete() || !missing_resources.is_empty();
    if degraded {
        warn!(
            missing_tools = ?state.tools.missing,
            missing_resources = ?missing_resources,
            "health check reports degraded toolchain"
        );
    }
    Json(HealthResponse {
        status: if degraded { "degraded" } else { "ok" },
        mode: state.config.mode,
        build: build_sha().to_string(),
        tools: state.tools.clone(),
        missing_resources,
    })
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.telemetry.render() {
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

/// `HH:MM:SS`, with whole days folded into the hours.
fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
}
