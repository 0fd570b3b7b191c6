//! Local JSON file backend, for development and single-host deployments.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;

use crate::{ConfigStore, Result};

pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

#[async_trait]
impl ConfigStore for FileConfigStore {
    fn describe(&self) -> String {
        format!("file://{}", self.path.display())
    }

    async fn load(&self) -> Value {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("Config file {} not found, starting empty", self.path.display());
                return Value::Object(Default::default());
            }
            Err(e) => {
                tracing::warn!("Error reading config file {}: {e}", self.path.display());
                return Value::Object(Default::default());
            }
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Config file {} is not valid JSON: {e}", self.path.display());
            Value::Object(Default::default())
        })
    }

    async fn save(&self, document: &Value) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        // Write then rename so a crash never leaves a truncated document.
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_string_pretty(document)?).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
