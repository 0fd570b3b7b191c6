use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use teamops_config::ServiceConfig;
use teamops_cron::scheduler::{JobScheduler, run_dispatched};
use teamops_gateway::GatewayState;
use teamops_storage::{load_app_config, open_store};

use crate::app;

/// Run the HTTP server and, unless disabled, the job scheduler until ctrl-c.
pub async fn run_serve(config: ServiceConfig, port: Option<u16>, with_scheduler: bool) -> Result<()> {
    let tz = config.tz()?;
    let store = open_store(&config.storage).context("failed to open config store")?;
    let runner = Arc::new(app::build_runner(&config, store.clone(), tz));
    let history = app::open_history();

    let scheduler = Arc::new(JobScheduler::new(tz).with_config_source(store.clone()));
    let app_config = load_app_config(store.as_ref()).await;
    if let Err(e) = app_config.validate() {
        warn!("Stored configuration is invalid: {e}");
    }
    scheduler.reload(&app_config).await;

    let cancel = CancellationToken::new();
    let (tx, rx) = mpsc::unbounded_channel();
    let scheduler_task = if with_scheduler {
        Some(tokio::spawn(scheduler.clone().run_loop(tx, cancel.clone())))
    } else {
        info!("Scheduler disabled; jobs run only when triggered");
        drop(tx);
        None
    };
    let runner_task = tokio::spawn(run_dispatched(runner.clone(), history.clone(), rx));

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutting down");
                shutdown.cancel();
            }
            Err(e) => warn!("Failed to listen for ctrl-c: {e}"),
        }
    });

    let port = port.unwrap_or(config.gateway.port);
    let addr: SocketAddr = format!("{}:{port}", config.gateway.host)
        .parse()
        .with_context(|| format!("invalid listen address {}:{port}", config.gateway.host))?;
    let state = Arc::new(GatewayState {
        runner,
        scheduler,
        history,
        auth_token: config.gateway.auth_token.clone(),
    });

    let result = teamops_gateway::serve(state, addr, cancel.clone()).await;

    cancel.cancel();
    if let Some(task) = scheduler_task {
        let _ = task.await;
    }
    // The sender is gone once the scheduler stops; the runner drains and exits.
    let _ = runner_task.await;
    result
}
