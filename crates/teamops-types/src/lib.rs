use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ──────────────────── On-call Types ────────────────────

/// A person eligible for the on-call rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Display name used in the channel topic.
    pub name: String,
    /// Slack member ID (e.g. "U012AB3CD").
    pub slack_user_id: String,
}

/// Rotation state: the ordered roster plus whose turn is next.
///
/// Order is significant and entries are not deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnCallSchedule {
    #[serde(default)]
    pub current_index: usize,
    #[serde(default)]
    pub roster: Vec<RosterEntry>,
}

// ──────────────────── Wiki Types ────────────────────

/// A wiki page as seen by the jobs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WikiPage {
    pub id: String,
    pub title: String,
    /// Current version number; updates must send `version + 1`.
    pub version: u64,
    /// Relative web UI link (e.g. "/spaces/TEAM/pages/123").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_ui: Option<String>,
}

// ──────────────────── Job Types ────────────────────

/// The jobs this service knows how to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobKind {
    #[serde(rename = "confluence-weekly-report")]
    WeeklyReport,
    #[serde(rename = "on-call-notification")]
    OnCall,
}

impl JobKind {
    pub const ALL: [JobKind; 2] = [JobKind::WeeklyReport, JobKind::OnCall];

    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::WeeklyReport => "confluence-weekly-report",
            JobKind::OnCall => "on-call-notification",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confluence-weekly-report" | "weekly-report" => Ok(JobKind::WeeklyReport),
            "on-call-notification" | "on-call" => Ok(JobKind::OnCall),
            other => Err(format!("unknown job: {other}")),
        }
    }
}

/// What started a job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobTrigger {
    Scheduled,
    Http,
    Cli,
}

impl JobTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobTrigger::Scheduled => "scheduled",
            JobTrigger::Http => "http",
            JobTrigger::Cli => "cli",
        }
    }
}

impl FromStr for JobTrigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(JobTrigger::Scheduled),
            "http" => Ok(JobTrigger::Http),
            "cli" => Ok(JobTrigger::Cli),
            other => Err(format!("unknown trigger: {other}")),
        }
    }
}

/// Result of a single job run.
///
/// A disabled job is `Skipped`, never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum JobOutcome {
    Skipped { reason: String },
    Succeeded { detail: String },
    Failed { error: String },
}

impl JobOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, JobOutcome::Failed { .. })
    }

    /// Human readable message for the trigger's caller.
    pub fn message(&self) -> &str {
        match self {
            JobOutcome::Skipped { reason } => reason,
            JobOutcome::Succeeded { detail } => detail,
            JobOutcome::Failed { error } => error,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            JobOutcome::Skipped { .. } => "skipped",
            JobOutcome::Succeeded { .. } => "succeeded",
            JobOutcome::Failed { .. } => "failed",
        }
    }
}
