//! teamops-confluence: Confluence REST client for the weekly report job.

pub mod api;
pub mod types;

use async_trait::async_trait;

use teamops_jobs::WikiApi;
use teamops_types::WikiPage;

pub use api::ConfluenceApi;

#[async_trait]
impl WikiApi for ConfluenceApi {
    async fn find_page_by_title(&self, title: &str) -> anyhow::Result<Option<WikiPage>> {
        self.get_page_by_title(title).await
    }

    async fn get_child_pages(&self, parent_id: &str) -> anyhow::Result<Vec<WikiPage>> {
        ConfluenceApi::get_child_pages(self, parent_id).await
    }

    async fn create_page(
        &self,
        parent_id: Option<&str>,
        title: &str,
        body: &str,
    ) -> anyhow::Result<WikiPage> {
        ConfluenceApi::create_page(self, parent_id, title, body).await
    }

    async fn copy_page(
        &self,
        page_id: &str,
        destination_parent_id: &str,
    ) -> anyhow::Result<WikiPage> {
        ConfluenceApi::copy_page(self, page_id, destination_parent_id).await
    }

    async fn update_page(
        &self,
        page_id: &str,
        title: &str,
        version: u64,
    ) -> anyhow::Result<WikiPage> {
        ConfluenceApi::update_page(self, page_id, title, version).await
    }

    fn page_url(&self, page: &WikiPage) -> String {
        ConfluenceApi::page_url(self, page)
    }
}
