//! teamops-gateway: HTTP surface for triggering jobs and editing the configuration.
//!
//! Routes:
//! - `GET /`, `GET /health` (never authenticated)
//! - `POST /schedule/confluence-weekly-report`, `POST /schedule/on-call-notification`
//! - `GET /api/config`, `PUT /api/config`
//! - `GET /api/jobs`, `GET /api/jobs/runs`
//!
//! When an auth token is configured every route but `/` and `/health` needs
//! `Authorization: Bearer <token>`.

pub mod handlers;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use teamops_cron::JobRun;
use teamops_cron::scheduler::JobScheduler;
use teamops_cron::store::JobRunStore;
use teamops_jobs::JobRunner;

/// Shared gateway state.
pub struct GatewayState {
    pub runner: Arc<JobRunner>,
    pub scheduler: Arc<JobScheduler>,
    pub history: Option<Arc<JobRunStore>>,
    pub auth_token: Option<String>,
}

impl GatewayState {
    fn record(&self, run: JobRun) {
        if let Some(history) = &self.history {
            if let Err(e) = history.record(&run) {
                error!(job = %run.job, "Failed to record job run: {e:#}");
            }
        }
    }
}

/// Build the router.
pub fn router(state: Arc<GatewayState>) -> Router {
    let protected = Router::new()
        .route(
            "/schedule/confluence-weekly-report",
            post(handlers::trigger_weekly_report),
        )
        .route(
            "/schedule/on-call-notification",
            post(handlers::trigger_on_call),
        )
        .route(
            "/api/config",
            get(handlers::get_config).put(handlers::put_config),
        )
        .route("/api/jobs", get(handlers::list_jobs))
        .route("/api/jobs/runs", get(handlers::list_runs))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .merge(protected)
        .with_state(state)
}

/// Serve until `cancel` fires.
pub async fn serve(
    state: Arc<GatewayState>,
    addr: SocketAddr,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Gateway listening on http://{addr}");
    if state.auth_token.is_some() {
        info!("  Bearer authentication: enabled");
    }

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .context("gateway server failed")?;
    info!("Gateway stopped");
    Ok(())
}

async fn require_token(
    State(state): State<Arc<GatewayState>>,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if let Some(expected) = &state.auth_token {
        match extract_bearer_token(request.headers()) {
            Some(token) if token == expected => {}
            _ => {
                warn!(path = %request.uri().path(), "Authentication failed");
                return Err(StatusCode::UNAUTHORIZED);
            }
        }
    }
    Ok(next.run(request).await)
}

/// Extract bearer token from Authorization header.
fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}
