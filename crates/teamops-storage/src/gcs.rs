//! Google Cloud Storage backend (JSON API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use url::Url;

use crate::{ConfigStore, Result, StorageError};

const DEFAULT_BASE_URL: &str = "https://storage.googleapis.com";
const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}

/// Stores the document as a single object in a GCS bucket.
pub struct GcsConfigStore {
    client: Client,
    base_url: Url,
    bucket: String,
    object: String,
    /// Static token; fetched from the metadata server per request when unset.
    access_token: Option<String>,
}

impl GcsConfigStore {
    pub fn new(bucket: String, object: String, access_token: Option<String>) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            base_url: Url::parse(DEFAULT_BASE_URL)?,
            bucket,
            object,
            access_token,
        })
    }

    /// Point the store at a different endpoint (e.g. a local emulator).
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.base_url = Url::parse(base_url)?;
        Ok(self)
    }

    fn download_url(&self) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::Config("base URL cannot have a path".into()))?
            .pop_if_empty()
            .extend(["storage", "v1", "b", self.bucket.as_str(), "o", self.object.as_str()]);
        url.query_pairs_mut().append_pair("alt", "media");
        Ok(url)
    }

    fn upload_url(&self) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StorageError::Config("base URL cannot have a path".into()))?
            .pop_if_empty()
            .extend(["upload", "storage", "v1", "b", self.bucket.as_str(), "o"]);
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", &self.object);
        Ok(url)
    }

    async fn token(&self) -> Result<String> {
        if let Some(token) = &self.access_token {
            return Ok(token.clone());
        }
        let token: MetadataToken = self
            .client
            .get(METADATA_TOKEN_URL)
            .header("Metadata-Flavor", "Google")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(token.access_token)
    }

    async fn try_load(&self) -> Result<Option<Value>> {
        let token = self.token().await?;
        let resp = self
            .client
            .get(self.download_url()?)
            .bearer_auth(token)
            .send()
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(StorageError::Status { status, body });
        }
        let text = resp.text().await?;
        Ok(Some(serde_json::from_str(&text)?))
    }
}

#[async_trait]
impl ConfigStore for GcsConfigStore {
    fn describe(&self) -> String {
        format!("gs://{}/{}", self.bucket, self.object)
    }

    async fn load(&self) -> Value {
        match self.try_load().await {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                tracing::info!(store = %self.describe(), "No config object yet, starting empty");
                Value::Object(Default::default())
            }
            Err(e) => {
                tracing::warn!(store = %self.describe(), "Error loading config from GCS: {e}");
                Value::Object(Default::default())
            }
        }
    }

    async fn save(&self, document: &Value) -> Result<()> {
        let body = serde_json::to_string_pretty(document)?;
        let token = self.token().await?;
        let resp = self
            .client
            .post(self.upload_url()?)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(store = %self.describe(), status, "Error saving config to GCS");
            return Err(StorageError::Status { status, body });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> GcsConfigStore {
        GcsConfigStore::new("ops-bucket".into(), "team/config.json".into(), Some("t".into()))
            .unwrap()
    }

    #[test]
    fn test_download_url_encodes_object_name() {
        let url = store().download_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/storage/v1/b/ops-bucket/o/team%2Fconfig.json?alt=media"
        );
    }

    #[test]
    fn test_upload_url() {
        let url = store().upload_url().unwrap();
        assert_eq!(
            url.as_str(),
            "https://storage.googleapis.com/upload/storage/v1/b/ops-bucket/o?uploadType=media&name=team%2Fconfig.json"
        );
    }

    #[test]
    fn test_custom_base_url() {
        let store = store().with_base_url("http://localhost:4443").unwrap();
        let url = store.download_url().unwrap();
        assert!(url.as_str().starts_with("http://localhost:4443/storage/v1/b/ops-bucket/o/"));
    }

    #[test]
    fn test_describe() {
        assert_eq!(store().describe(), "gs://ops-bucket/team/config.json");
    }
}
