//! teamops-cron: timers for the weekly report and on-call jobs.
//!
//! The scheduler keeps one entry per job kind, recomputed from the stored
//! configuration whenever it changes, and hands due jobs to a single runner
//! task. Every finished run is written to the run history.

pub mod scheduler;
pub mod store;

use chrono::{DateTime, Utc};
use serde::Serialize;

use teamops_types::{JobKind, JobOutcome, JobTrigger};

/// A timer for one job kind.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledJob {
    pub kind: JobKind,
    /// Five-field cron expression, as configured.
    pub schedule: String,
    pub enabled: bool,
    pub last_run: Option<DateTime<Utc>>,
    /// `None` when disabled or the expression does not parse.
    pub next_run: Option<DateTime<Utc>>,
}

/// One finished job run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRun {
    pub id: String,
    pub job: JobKind,
    pub trigger: JobTrigger,
    #[serde(flatten)]
    pub outcome: JobOutcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobRun {
    pub fn new(
        job: JobKind,
        trigger: JobTrigger,
        outcome: JobOutcome,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            job,
            trigger,
            outcome,
            started_at,
            finished_at,
        }
    }
}
