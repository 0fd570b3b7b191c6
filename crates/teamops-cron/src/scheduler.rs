//! Job scheduler: evaluates the configured cron expressions and dispatches due jobs.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use tokio::sync::{RwLock, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use teamops_config::{AppConfig, next_fire_after, parse_cron};
use teamops_jobs::JobRunner;
use teamops_storage::ConfigStore;
use teamops_types::{JobKind, JobTrigger};

use crate::store::JobRunStore;
use crate::{JobRun, ScheduledJob};

const DEFAULT_TICK: Duration = Duration::from_secs(30);

/// Holds one timer per job kind.
pub struct JobScheduler {
    tz: Tz,
    tick: Duration,
    jobs: RwLock<Vec<ScheduledJob>>,
    /// Re-read every tick so edits saved outside the gateway take effect.
    source: Option<Arc<dyn ConfigStore>>,
}

impl JobScheduler {
    pub fn new(tz: Tz) -> Self {
        Self {
            tz,
            tick: DEFAULT_TICK,
            jobs: RwLock::new(Vec::new()),
            source: None,
        }
    }

    pub fn with_config_source(mut self, store: Arc<dyn ConfigStore>) -> Self {
        self.source = Some(store);
        self
    }

    /// How often the loop checks for due jobs.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    /// Replace all timers from `config`.
    pub async fn reload(&self, config: &AppConfig) {
        self.reload_at(config, Utc::now()).await;
    }

    pub async fn reload_at(&self, config: &AppConfig, now: DateTime<Utc>) {
        let mut jobs = self.jobs.write().await;
        let previous = std::mem::take(&mut *jobs);

        for kind in JobKind::ALL {
            let (schedule, enabled) = timer_settings(config, kind);
            let next_run = if enabled {
                self.next_run(schedule, now)
            } else {
                None
            };
            let last_run = previous
                .iter()
                .find(|j| j.kind == kind)
                .and_then(|j| j.last_run);

            info!(job = %kind, schedule = %schedule, enabled, next_run = ?next_run, "Scheduled job");
            jobs.push(ScheduledJob {
                kind,
                schedule: schedule.clone(),
                enabled,
                last_run,
                next_run,
            });
        }
    }

    /// Reload from `config` only if a schedule or enabled flag changed.
    ///
    /// Unchanged timers keep their pending fire time. Returns whether anything
    /// was rescheduled.
    pub async fn sync_at(&self, config: &AppConfig, now: DateTime<Utc>) -> bool {
        let unchanged = {
            let jobs = self.jobs.read().await;
            !jobs.is_empty()
                && jobs.iter().all(|job| {
                    let (schedule, enabled) = timer_settings(config, job.kind);
                    job.schedule == *schedule && job.enabled == enabled
                })
        };
        if unchanged {
            return false;
        }
        info!("Stored job configuration changed, rescheduling");
        self.reload_at(config, now).await;
        true
    }

    /// Pick up configuration saved to the store by another process.
    ///
    /// An empty, malformed or invalid document leaves the timers alone; a
    /// transient storage failure reads as `{}`.
    pub async fn refresh_at(&self, now: DateTime<Utc>) -> bool {
        let Some(source) = &self.source else {
            return false;
        };
        let document = source.load().await;
        if document.as_object().is_some_and(|fields| fields.is_empty()) {
            return false;
        }
        let config = match AppConfig::from_value(document) {
            Ok(config) => config,
            Err(e) => {
                debug!("Ignoring stored configuration: {e}");
                return false;
            }
        };
        if let Err(e) = config.validate() {
            debug!("Ignoring stored configuration: {e}");
            return false;
        }
        self.sync_at(&config, now).await
    }

    fn next_run(&self, schedule: &str, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match parse_cron(schedule) {
            Ok(parsed) => next_fire_after(&parsed, &self.tz, after),
            Err(e) => {
                warn!(schedule = %schedule, "Not scheduling job: {e}");
                None
            }
        }
    }

    pub async fn list_jobs(&self) -> Vec<ScheduledJob> {
        self.jobs.read().await.clone()
    }

    /// Jobs whose next run is at or before `now`.
    pub async fn due_jobs(&self, now: DateTime<Utc>) -> Vec<JobKind> {
        self.jobs
            .read()
            .await
            .iter()
            .filter(|j| j.enabled && j.next_run.is_some_and(|next| next <= now))
            .map(|j| j.kind)
            .collect()
    }

    /// Record a dispatch and move the timer to the following fire time.
    pub async fn mark_ran(&self, kind: JobKind, now: DateTime<Utc>) {
        let mut jobs = self.jobs.write().await;
        if let Some(job) = jobs.iter_mut().find(|j| j.kind == kind) {
            job.last_run = Some(now);
            job.next_run = self.next_run(&job.schedule, now);
        }
    }

    /// Dispatch due jobs until `cancel` fires.
    pub async fn run_loop(
        self: Arc<Self>,
        sender: mpsc::UnboundedSender<JobKind>,
        cancel: CancellationToken,
    ) {
        info!(tz = %self.tz, "Job scheduler started");
        loop {
            let now = Utc::now();
            self.refresh_at(now).await;
            for kind in self.due_jobs(now).await {
                info!(job = %kind, "Dispatching scheduled job");
                if let Err(e) = sender.send(kind) {
                    warn!("Failed to dispatch job {kind}: {e}");
                }
                self.mark_ran(kind, now).await;
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.tick) => {}
            }
        }
        info!("Job scheduler stopped");
    }
}

fn timer_settings(config: &AppConfig, kind: JobKind) -> (&String, bool) {
    match kind {
        JobKind::WeeklyReport => (
            &config.confluence_config.schedule,
            config.confluence_config.enabled,
        ),
        JobKind::OnCall => (&config.on_call_config.schedule, config.on_call_config.enabled),
    }
}

/// Run dispatched jobs one at a time and record each outcome.
pub async fn run_dispatched(
    runner: Arc<JobRunner>,
    history: Option<Arc<JobRunStore>>,
    mut receiver: mpsc::UnboundedReceiver<JobKind>,
) {
    while let Some(kind) = receiver.recv().await {
        let started_at = Utc::now();
        let outcome = runner.run(kind).await;
        let run = JobRun::new(kind, JobTrigger::Scheduled, outcome, started_at, Utc::now());
        if let Some(history) = &history {
            if let Err(e) = history.record(&run) {
                error!(job = %kind, "Failed to record job run: {e:#}");
            }
        }
    }
}
