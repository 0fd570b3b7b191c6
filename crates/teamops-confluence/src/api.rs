//! Confluence Cloud REST API (v1) HTTP client.

use std::time::Duration;

use anyhow::{Context, bail};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use teamops_config::ConfluenceSettings;
use teamops_types::WikiPage;

use crate::types::{
    AncestorRef, Content, ContentList, ContentVersion, CopyDestination, CopyPageParams,
    CreatePageParams, PageBody, SpaceRef, StorageBody, UpdatePageParams,
};

/// HTTP client for one Confluence space.
pub struct ConfluenceApi {
    client: Client,
    base_url: String,
    site_url: String,
    authorization: String,
    space_key: String,
}

impl ConfluenceApi {
    /// Build a client from the service settings.
    pub fn new(settings: &ConfluenceSettings) -> anyhow::Result<Self> {
        if settings.domain.is_empty() {
            bail!("CONFLUENCE_DOMAIN is not set");
        }
        if settings.username.is_empty() {
            bail!("CONFLUENCE_USERNAME is not set");
        }
        if settings.api_token.is_empty() {
            bail!("CONFLUENCE_API_TOKEN is not set");
        }
        if settings.space_key.is_empty() {
            bail!("CONFLUENCE_SPACE_KEY is not set");
        }

        if !settings.verify_tls {
            warn!(
                domain = %settings.domain,
                "TLS certificate verification is DISABLED for Confluence; use only for local development"
            );
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .danger_accept_invalid_certs(!settings.verify_tls)
            .build()
            .context("failed to build Confluence HTTP client")?;

        let domain = settings.domain.trim_end_matches('/');
        Ok(Self {
            client,
            base_url: format!("https://{domain}/wiki/rest/api"),
            site_url: format!("https://{domain}/wiki"),
            authorization: basic_auth(&settings.username, &settings.api_token),
            space_key: settings.space_key.clone(),
        })
    }

    /// Look up a page in the space by exact title.
    pub async fn get_page_by_title(&self, title: &str) -> anyhow::Result<Option<WikiPage>> {
        let resp = self
            .client
            .get(format!("{}/content", self.base_url))
            .header("Authorization", &self.authorization)
            .query(&[
                ("spaceKey", self.space_key.as_str()),
                ("title", title),
                ("expand", "version"),
            ])
            .send()
            .await
            .context("get page by title request failed")?;
        let list: ContentList = parse(resp, "get page by title").await?;
        Ok(list.results.into_iter().next().map(WikiPage::from))
    }

    /// Direct child pages of `page_id`.
    pub async fn get_child_pages(&self, page_id: &str) -> anyhow::Result<Vec<WikiPage>> {
        let resp = self
            .client
            .get(format!("{}/content/{page_id}/child/page", self.base_url))
            .header("Authorization", &self.authorization)
            .query(&[("limit", "200"), ("expand", "version")])
            .send()
            .await
            .context("get child pages request failed")?;
        let list: ContentList = parse(resp, "get child pages").await?;
        Ok(list.results.into_iter().map(WikiPage::from).collect())
    }

    /// Create a page with a storage-format body.
    pub async fn create_page(
        &self,
        parent_id: Option<&str>,
        title: &str,
        body: &str,
    ) -> anyhow::Result<WikiPage> {
        let params = CreatePageParams {
            content_type: "page",
            title,
            space: SpaceRef {
                key: &self.space_key,
            },
            ancestors: parent_id.map(|id| AncestorRef { id }).into_iter().collect(),
            body: PageBody {
                storage: StorageBody {
                    value: body,
                    representation: "storage",
                },
            },
        };
        let resp = self
            .client
            .post(format!("{}/content/", self.base_url))
            .header("Authorization", &self.authorization)
            .json(&params)
            .send()
            .await
            .context("create page request failed")?;
        let content: Content = parse(resp, "create page").await?;
        Ok(content.into())
    }

    /// Copy a page under a new parent.
    pub async fn copy_page(
        &self,
        page_id: &str,
        destination_parent_id: &str,
    ) -> anyhow::Result<WikiPage> {
        let params = CopyPageParams {
            destination: CopyDestination {
                destination_type: "parent_page",
                value: destination_parent_id,
            },
        };
        debug!(page_id, destination_parent_id, "Copying Confluence page");
        let resp = self
            .client
            .post(format!("{}/content/{page_id}/copy", self.base_url))
            .header("Authorization", &self.authorization)
            .json(&params)
            .send()
            .await
            .context("copy page request failed")?;
        let content: Content = parse(resp, "copy page").await?;
        Ok(content.into())
    }

    /// Change a page's title. `version` must be the current version plus one.
    pub async fn update_page(
        &self,
        page_id: &str,
        title: &str,
        version: u64,
    ) -> anyhow::Result<WikiPage> {
        let params = UpdatePageParams {
            version: ContentVersion { number: version },
            title,
            content_type: "page",
        };
        let resp = self
            .client
            .put(format!("{}/content/{page_id}", self.base_url))
            .header("Authorization", &self.authorization)
            .json(&params)
            .send()
            .await
            .context("update page request failed")?;
        let content: Content = parse(resp, "update page").await?;
        Ok(content.into())
    }

    /// Browser URL for a page.
    pub fn page_url(&self, page: &WikiPage) -> String {
        match page.web_ui.as_deref() {
            Some(path) if path.starts_with("/wiki/") => {
                format!("{}{}", self.site_url.trim_end_matches("/wiki"), path)
            }
            Some(path) => format!("{}{path}", self.site_url),
            None => format!("{}/pages/viewpage.action?pageId={}", self.site_url, page.id),
        }
    }
}

fn basic_auth(username: &str, api_token: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{username}:{api_token}")))
}

async fn parse<T: DeserializeOwned>(resp: Response, what: &str) -> anyhow::Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("{what} failed ({status}): {body}");
    }
    resp.json()
        .await
        .with_context(|| format!("{what} response parse failed"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ConfluenceSettings {
        ConfluenceSettings {
            domain: "team.atlassian.net".into(),
            username: "bot@example.com".into(),
            api_token: "secret".into(),
            space_key: "TEAM".into(),
            verify_tls: true,
        }
    }

    fn page(web_ui: Option<&str>) -> WikiPage {
        WikiPage {
            id: "77".into(),
            title: "t".into(),
            version: 2,
            web_ui: web_ui.map(String::from),
        }
    }

    #[test]
    fn test_base_url() {
        let api = ConfluenceApi::new(&settings()).unwrap();
        assert_eq!(api.base_url, "https://team.atlassian.net/wiki/rest/api");
        assert_eq!(api.space_key, "TEAM");
    }

    #[test]
    fn test_basic_auth_header() {
        assert_eq!(
            basic_auth("bot@example.com", "secret"),
            "Basic Ym90QGV4YW1wbGUuY29tOnNlY3JldA=="
        );
    }

    #[test]
    fn test_missing_settings_rejected() {
        let mut s = settings();
        s.space_key.clear();
        let err = ConfluenceApi::new(&s).err().unwrap();
        assert!(err.to_string().contains("CONFLUENCE_SPACE_KEY"));
    }

    #[test]
    fn test_insecure_client_builds() {
        let mut s = settings();
        s.verify_tls = false;
        assert!(ConfluenceApi::new(&s).is_ok());
    }

    #[test]
    fn test_page_url() {
        let api = ConfluenceApi::new(&settings()).unwrap();
        assert_eq!(
            api.page_url(&page(Some("/spaces/TEAM/pages/77/Title"))),
            "https://team.atlassian.net/wiki/spaces/TEAM/pages/77/Title"
        );
        assert_eq!(
            api.page_url(&page(Some("/wiki/spaces/TEAM/pages/77"))),
            "https://team.atlassian.net/wiki/spaces/TEAM/pages/77"
        );
        assert_eq!(
            api.page_url(&page(None)),
            "https://team.atlassian.net/wiki/pages/viewpage.action?pageId=77"
        );
    }
}
