//! HTTP handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{error, info, warn};

use teamops_config::AppConfig;
use teamops_cron::JobRun;
use teamops_storage::{load_app_config, save_app_config};
use teamops_types::{JobKind, JobOutcome, JobTrigger};

use crate::GatewayState;

const DEFAULT_RUN_LIMIT: usize = 20;
const MAX_RUN_LIMIT: usize = 200;

/// Error response: `{"detail": ...}` with a status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }

    fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

/// GET /
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Hello, Development Team Automation Tool Backend!" }))
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// POST /schedule/confluence-weekly-report
pub async fn trigger_weekly_report(
    State(state): State<Arc<GatewayState>>,
) -> Result<Json<Value>, ApiError> {
    trigger(&state, JobKind::WeeklyReport).await
}

/// POST /schedule/on-call-notification
pub async fn trigger_on_call(
    State(state): State<Arc<GatewayState>>,
) -> Result<Json<Value>, ApiError> {
    trigger(&state, JobKind::OnCall).await
}

async fn trigger(state: &GatewayState, kind: JobKind) -> Result<Json<Value>, ApiError> {
    let started_at = Utc::now();
    let outcome = state.runner.run(kind).await;
    state.record(JobRun::new(
        kind,
        JobTrigger::Http,
        outcome.clone(),
        started_at,
        Utc::now(),
    ));

    match outcome {
        JobOutcome::Failed { error } => Err(ApiError::internal(error)),
        other => Ok(Json(json!({ "message": other.message() }))),
    }
}

/// GET /api/config
pub async fn get_config(State(state): State<Arc<GatewayState>>) -> Result<Json<Value>, ApiError> {
    let config = load_app_config(state.runner.store().as_ref()).await;
    config
        .to_value()
        .map(Json)
        .map_err(|e| ApiError::internal(e.to_string()))
}

/// PUT /api/config: validate, save, then reschedule.
pub async fn put_config(
    State(state): State<Arc<GatewayState>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = body.map_err(|rejection| {
        warn!("Rejected config update: {rejection}");
        ApiError::bad_request(rejection.body_text())
    })?;
    let config = AppConfig::from_value(body).map_err(|e| {
        warn!("Rejected config update: {e}");
        ApiError::bad_request(e.to_string())
    })?;
    config.validate().map_err(|e| {
        warn!("Rejected config update: {e}");
        ApiError::bad_request(e.to_string())
    })?;

    save_app_config(state.runner.store().as_ref(), &config)
        .await
        .map_err(|e| {
            error!("Failed to save config: {e}");
            ApiError::internal(format!("Failed to save configuration: {e}"))
        })?;
    state.scheduler.reload(&config).await;
    info!(
        roster = config.on_call_schedule.roster.len(),
        "Configuration updated"
    );

    config
        .to_value()
        .map(Json)
        .map_err(|e| ApiError::internal(e.to_string()))
}

/// GET /api/jobs
pub async fn list_jobs(State(state): State<Arc<GatewayState>>) -> Json<Value> {
    let jobs = state.scheduler.list_jobs().await;
    Json(json!({ "jobs": jobs }))
}

#[derive(Debug, Default, Deserialize)]
pub struct RunsQuery {
    limit: Option<usize>,
}

/// GET /api/jobs/runs?limit=N
pub async fn list_runs(
    State(state): State<Arc<GatewayState>>,
    Query(query): Query<RunsQuery>,
) -> Result<Json<Value>, ApiError> {
    let limit = query.limit.unwrap_or(DEFAULT_RUN_LIMIT).min(MAX_RUN_LIMIT);
    let runs = match &state.history {
        Some(history) => history
            .recent(limit)
            .map_err(|e| ApiError::internal(format!("Failed to read job history: {e:#}")))?,
        None => Vec::new(),
    };
    Ok(Json(json!({ "runs": runs })))
}
