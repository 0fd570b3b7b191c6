//! Wiki collaborator seam and page lookups built on it.

use async_trait::async_trait;
use chrono::NaiveDate;

use teamops_config::ConfluenceConfig;
use teamops_types::WikiPage;

use crate::report::report_end_date;

/// Page operations the weekly report job needs from the wiki.
#[async_trait]
pub trait WikiApi: Send + Sync {
    /// Look up a page in the configured space by exact title.
    async fn find_page_by_title(&self, title: &str) -> anyhow::Result<Option<WikiPage>>;

    /// Direct children of a page.
    async fn get_child_pages(&self, parent_id: &str) -> anyhow::Result<Vec<WikiPage>>;

    /// Create a page under `parent_id`, or at the space root when `None`.
    async fn create_page(
        &self,
        parent_id: Option<&str>,
        title: &str,
        body: &str,
    ) -> anyhow::Result<WikiPage>;

    /// Copy a page (with its body) under another parent.
    async fn copy_page(&self, page_id: &str, destination_parent_id: &str)
    -> anyhow::Result<WikiPage>;

    /// Rename a page. `version` must be the current version plus one.
    async fn update_page(&self, page_id: &str, title: &str, version: u64)
    -> anyhow::Result<WikiPage>;

    /// Absolute browser URL of a page.
    fn page_url(&self, page: &WikiPage) -> String;
}

/// Find the year folder, creating it when missing.
///
/// Returns the folder and whether it already existed.
pub async fn resolve_root_folder(
    wiki: &dyn WikiApi,
    confluence: &ConfluenceConfig,
    year: i32,
) -> anyhow::Result<(WikiPage, bool)> {
    let title = confluence.root_folder_title(year);
    if let Some(page) = wiki.find_page_by_title(&title).await? {
        return Ok((page, true));
    }

    tracing::info!(title = %title, "Root folder not found, creating it");
    let page = wiki
        .create_page(
            confluence.root_parent_id.as_deref(),
            &title,
            &format!("{year} weekly reports."),
        )
        .await?;
    Ok((page, false))
}

/// The child page whose title carries the latest end date.
///
/// Children without a parseable date range are ignored.
pub async fn find_latest_report(
    wiki: &dyn WikiApi,
    parent_id: &str,
) -> anyhow::Result<Option<(WikiPage, NaiveDate)>> {
    let children = wiki.get_child_pages(parent_id).await?;

    let mut latest: Option<(WikiPage, NaiveDate)> = None;
    for page in children {
        let end = match report_end_date(&page.title) {
            Ok(end) => end,
            Err(e) => {
                tracing::debug!(page_id = %page.id, "Skipping non-report page: {e}");
                continue;
            }
        };
        if latest.as_ref().is_none_or(|(_, best)| end > *best) {
            latest = Some((page, end));
        }
    }
    Ok(latest)
}
