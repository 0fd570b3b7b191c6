//! Wiring: build the job runner and run history from the service settings.

use std::sync::Arc;

use anyhow::bail;
use async_trait::async_trait;
use chrono_tz::Tz;
use tracing::{info, warn};

use teamops_config::ServiceConfig;
use teamops_confluence::ConfluenceApi;
use teamops_cron::store::JobRunStore;
use teamops_jobs::{ChatApi, JobRunner, WikiApi};
use teamops_slack::SlackApi;
use teamops_storage::ConfigStore;
use teamops_types::WikiPage;

/// Stand-in for a client whose credentials are missing.
///
/// Jobs that need it fail at run time with `reason`, the same way a
/// rejected request would; the rest of the service keeps working.
struct Unconfigured {
    reason: String,
}

#[async_trait]
impl WikiApi for Unconfigured {
    async fn find_page_by_title(&self, _title: &str) -> anyhow::Result<Option<WikiPage>> {
        bail!("{}", self.reason)
    }

    async fn get_child_pages(&self, _parent_id: &str) -> anyhow::Result<Vec<WikiPage>> {
        bail!("{}", self.reason)
    }

    async fn create_page(
        &self,
        _parent_id: Option<&str>,
        _title: &str,
        _body: &str,
    ) -> anyhow::Result<WikiPage> {
        bail!("{}", self.reason)
    }

    async fn copy_page(
        &self,
        _page_id: &str,
        _destination_parent_id: &str,
    ) -> anyhow::Result<WikiPage> {
        bail!("{}", self.reason)
    }

    async fn update_page(
        &self,
        _page_id: &str,
        _title: &str,
        _version: u64,
    ) -> anyhow::Result<WikiPage> {
        bail!("{}", self.reason)
    }

    fn page_url(&self, page: &WikiPage) -> String {
        page.web_ui.clone().unwrap_or_default()
    }
}

#[async_trait]
impl ChatApi for Unconfigured {
    async fn post_message(&self, _channel: &str, _text: &str) -> anyhow::Result<()> {
        bail!("{}", self.reason)
    }

    async fn set_channel_topic(&self, _channel: &str, _topic: &str) -> anyhow::Result<()> {
        bail!("{}", self.reason)
    }
}

fn wiki_client(config: &ServiceConfig) -> Arc<dyn WikiApi> {
    match ConfluenceApi::new(&config.confluence) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            warn!("Confluence client unavailable: {e:#}");
            Arc::new(Unconfigured {
                reason: format!("Confluence is not configured: {e:#}"),
            })
        }
    }
}

fn chat_client(config: &ServiceConfig) -> Arc<dyn ChatApi> {
    match SlackApi::new(&config.slack.api_token) {
        Ok(api) => Arc::new(api),
        Err(e) => {
            warn!("Slack client unavailable: {e:#}");
            Arc::new(Unconfigured {
                reason: format!("Slack is not configured: {e:#}"),
            })
        }
    }
}

pub fn build_runner(config: &ServiceConfig, store: Arc<dyn ConfigStore>, tz: Tz) -> JobRunner {
    info!(store = %store.describe(), tz = %tz, "Job configuration store ready");
    JobRunner::new(wiki_client(config), chat_client(config), store, tz)
}

/// Open the run history database, or run without one.
pub fn open_history() -> Option<Arc<JobRunStore>> {
    let dir = match teamops_config::ensure_config_dir() {
        Ok(dir) => dir,
        Err(e) => {
            warn!("Failed to resolve config dir, running without job history: {e}");
            return None;
        }
    };
    let db_path = dir.join("teamops.db");
    match JobRunStore::open(&db_path) {
        Ok(store) => {
            info!("Job history: {}", db_path.display());
            Some(Arc::new(store))
        }
        Err(e) => {
            warn!("Failed to open job history, running without it: {e:#}");
            None
        }
    }
}
