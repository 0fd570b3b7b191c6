//! teamops-storage: persistence for the job configuration document.
//!
//! The document is a single JSON blob. Loading never fails: an absent or
//! unreadable document is treated as `{}`, which deserializes to the default
//! [`AppConfig`]. Saving reports every failure to the caller.

pub mod file;
pub mod gcs;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use teamops_config::{AppConfig, StorageBackend, StorageSettings};

pub use file::FileConfigStore;
pub use gcs::GcsConfigStore;
pub use memory::MemoryConfigStore;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("Storage returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Storage misconfigured: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// A place the configuration document can be loaded from and saved to.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Short description for logs (e.g. "gs://bucket/config.json").
    fn describe(&self) -> String;

    /// Load the raw document, `{}` when absent or unreadable.
    async fn load(&self) -> Value;

    /// Replace the stored document.
    async fn save(&self, document: &Value) -> Result<()>;
}

/// Load and parse the configuration document.
///
/// A document that does not match the schema is logged and replaced by the
/// defaults for this invocation; the stored copy is left untouched.
pub async fn load_app_config(store: &dyn ConfigStore) -> AppConfig {
    let document = store.load().await;
    match AppConfig::from_value(document) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                store = %store.describe(),
                "Stored config does not match schema, using defaults: {e}"
            );
            AppConfig::default()
        }
    }
}

/// Serialize and save the configuration document.
pub async fn save_app_config(store: &dyn ConfigStore, config: &AppConfig) -> Result<()> {
    let document = serde_json::to_value(config)?;
    store.save(&document).await?;
    tracing::debug!(store = %store.describe(), "Config saved");
    Ok(())
}

/// Build the store described by the service settings.
pub fn open_store(settings: &StorageSettings) -> Result<Arc<dyn ConfigStore>> {
    let use_gcs = match settings.backend {
        StorageBackend::Gcs => true,
        StorageBackend::File => false,
        StorageBackend::Auto => settings.bucket.is_some(),
    };

    if use_gcs {
        let bucket = settings.bucket.clone().ok_or_else(|| {
            StorageError::Config("GCS_BUCKET_NAME environment variable not set.".into())
        })?;
        let store = GcsConfigStore::new(
            bucket,
            settings.object_path.clone(),
            settings.access_token.clone(),
        )?;
        tracing::info!("Config store: {}", store.describe());
        return Ok(Arc::new(store));
    }

    let path = match &settings.local_path {
        Some(p) => p.clone(),
        None => teamops_config::config_dir()
            .map_err(|e| StorageError::Config(e.to_string()))?
            .join("app-config.json"),
    };
    let store = FileConfigStore::new(path);
    tracing::info!("Config store: {}", store.describe());
    Ok(Arc::new(store))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use teamops_types::{OnCallSchedule, RosterEntry};

    #[tokio::test]
    async fn test_load_missing_document_gives_defaults() {
        let store = MemoryConfigStore::default();
        let config = load_app_config(&store).await;
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn test_schema_mismatch_gives_defaults_without_saving() {
        let store = MemoryConfigStore::new(json!({"on_call_schedule": {"roster": "oops"}}));
        let config = load_app_config(&store).await;
        assert_eq!(config, AppConfig::default());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn test_round_trip_preserves_rotation_state() {
        let store = MemoryConfigStore::default();
        let mut config = AppConfig::default();
        config.on_call_schedule = OnCallSchedule {
            current_index: 2,
            roster: vec![
                RosterEntry {
                    name: "Alice".into(),
                    slack_user_id: "U001".into(),
                },
                RosterEntry {
                    name: "Bob".into(),
                    slack_user_id: "U002".into(),
                },
                RosterEntry {
                    name: "Carol".into(),
                    slack_user_id: "U003".into(),
                },
            ],
        };

        save_app_config(&store, &config).await.unwrap();
        let reloaded = load_app_config(&store).await;
        assert_eq!(reloaded.on_call_schedule, config.on_call_schedule);
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_open_store_auto_without_bucket_is_file() {
        let settings = StorageSettings {
            local_path: Some(std::env::temp_dir().join("teamops-open-store.json")),
            ..Default::default()
        };
        let store = open_store(&settings).unwrap();
        assert!(store.describe().starts_with("file://"));
    }

    #[test]
    fn test_open_store_gcs_requires_bucket() {
        let settings = StorageSettings {
            backend: StorageBackend::Gcs,
            ..Default::default()
        };
        assert!(matches!(open_store(&settings), Err(StorageError::Config(_))));
    }

    #[test]
    fn test_open_store_auto_with_bucket_is_gcs() {
        let settings = StorageSettings {
            bucket: Some("ops".into()),
            ..Default::default()
        };
        let store = open_store(&settings).unwrap();
        assert_eq!(store.describe(), "gs://ops/config.json");
    }
}
