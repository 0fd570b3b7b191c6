//! teamops-jobs: the weekly report and on-call jobs.
//!
//! The jobs talk to the outside world only through [`WikiApi`], [`ChatApi`]
//! and [`ConfigStore`]; the Confluence, Slack and GCS clients live in their
//! own crates. Every run loads the configuration document afresh and ends in
//! a [`JobOutcome`], never a panic or an error the caller must unwind.

pub mod chat;
pub mod on_call;
pub mod report;
pub mod rotation;
pub mod weekly_report;
pub mod wiki;

#[cfg(any(test, feature = "test-util"))]
pub mod fakes;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use thiserror::Error;
use tracing::info;

use teamops_storage::{ConfigStore, StorageError, load_app_config};
use teamops_types::{JobKind, JobOutcome};

pub use chat::ChatApi;
pub use report::{DateRange, NextReport, ReportTitleError, next_report_title, report_end_date};
pub use rotation::{RotationError, advance};
pub use wiki::WikiApi;

#[derive(Debug, Error)]
pub enum JobError {
    #[error(transparent)]
    Title(#[from] ReportTitleError),
    #[error(transparent)]
    Rotation(#[from] RotationError),
    #[error("{0}")]
    NoReports(String),
    #[error("Confluence error: {0:#}")]
    Wiki(anyhow::Error),
    #[error("Slack error: {0:#}")]
    Chat(anyhow::Error),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Runs jobs against a fixed set of collaborators.
pub struct JobRunner {
    wiki: Arc<dyn WikiApi>,
    chat: Arc<dyn ChatApi>,
    store: Arc<dyn ConfigStore>,
    tz: Tz,
}

impl JobRunner {
    pub fn new(
        wiki: Arc<dyn WikiApi>,
        chat: Arc<dyn ChatApi>,
        store: Arc<dyn ConfigStore>,
        tz: Tz,
    ) -> Self {
        Self {
            wiki,
            chat,
            store,
            tz,
        }
    }

    pub fn store(&self) -> &Arc<dyn ConfigStore> {
        &self.store
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Today's date in the service timezone.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz).date_naive()
    }

    /// Load the current configuration and run one job to completion.
    pub async fn run(&self, kind: JobKind) -> JobOutcome {
        self.run_on(kind, self.today()).await
    }

    /// Like [`JobRunner::run`] with an explicit "today".
    pub async fn run_on(&self, kind: JobKind, today: NaiveDate) -> JobOutcome {
        info!(job = %kind, "Running job");
        let config = load_app_config(self.store.as_ref()).await;
        let outcome = match kind {
            JobKind::WeeklyReport => {
                weekly_report::run(self.wiki.as_ref(), self.chat.as_ref(), &config, today).await
            }
            JobKind::OnCall => {
                on_call::run(self.chat.as_ref(), self.store.as_ref(), &config).await
            }
        };
        info!(job = %kind, status = outcome.status(), "Job finished");
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeChat, FakeWiki};
    use serde_json::json;
    use teamops_storage::MemoryConfigStore;

    fn runner(wiki: Arc<FakeWiki>, chat: Arc<FakeChat>, store: Arc<MemoryConfigStore>) -> JobRunner {
        JobRunner::new(wiki, chat, store, chrono_tz::UTC)
    }

    #[tokio::test]
    async fn test_empty_store_skips_both_jobs() {
        let runner = runner(
            Arc::new(FakeWiki::new()),
            Arc::new(FakeChat::new()),
            Arc::new(MemoryConfigStore::default()),
        );
        for kind in JobKind::ALL {
            let outcome = runner.run(kind).await;
            assert!(matches!(outcome, JobOutcome::Skipped { .. }), "{kind}");
        }
    }

    #[tokio::test]
    async fn test_on_call_twice_rotates_through_store() {
        let chat = Arc::new(FakeChat::new());
        let store = Arc::new(MemoryConfigStore::new(json!({
            "on_call_config": { "enabled": true, "slack_channel": "C1" },
            "on_call_schedule": {
                "current_index": 0,
                "roster": [
                    { "name": "Alice", "slack_user_id": "U1" },
                    { "name": "Bob", "slack_user_id": "U2" }
                ]
            }
        })));
        let runner = runner(Arc::new(FakeWiki::new()), chat.clone(), store.clone());

        runner.run(JobKind::OnCall).await;
        runner.run(JobKind::OnCall).await;
        let third = runner.run(JobKind::OnCall).await;

        let names: Vec<String> = chat.topics().into_iter().map(|(_, t)| t).collect();
        assert_eq!(
            names,
            [
                ":uia_cat: 本週值班人員: Alice",
                ":uia_cat: 本週值班人員: Bob",
                ":uia_cat: 本週值班人員: Alice",
            ]
        );
        assert_eq!(third.message(), "On-call notification triggered for Alice (U1).");
        assert_eq!(store.save_count(), 3);
    }

    #[tokio::test]
    async fn test_weekly_report_through_runner() {
        let wiki = Arc::new(FakeWiki::new());
        let root = wiki.add_page(None, "Team Weekly 2025");
        wiki.add_page(Some(&root.id), "2025 W23 RD4 Team Report (0602-0606)");
        let store = Arc::new(MemoryConfigStore::new(json!({
            "confluence_config": {
                "weekly_report_enabled": true,
                "slack_channel": "C-REPORT",
                "root_folder_prefix": "Team Weekly"
            }
        })));
        let chat = Arc::new(FakeChat::new());
        let runner = runner(wiki.clone(), chat.clone(), store);

        let date = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();
        let outcome = runner.run_on(JobKind::WeeklyReport, date).await;
        assert!(matches!(outcome, JobOutcome::Succeeded { .. }), "{outcome:?}");
        assert_eq!(chat.messages()[0].0, "C-REPORT");
    }
}
