//! In-process store, used by tests and dry runs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;

use crate::{ConfigStore, Result, StorageError};

#[derive(Default)]
pub struct MemoryConfigStore {
    document: Mutex<Option<Value>>,
    fail_saves: AtomicBool,
    saves: AtomicUsize,
}

impl MemoryConfigStore {
    pub fn new(document: Value) -> Self {
        Self {
            document: Mutex::new(Some(document)),
            ..Default::default()
        }
    }

    /// Make every following `save` fail.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// The stored document, if any.
    pub fn snapshot(&self) -> Option<Value> {
        self.document
            .lock()
            .map(|doc| doc.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    async fn load(&self) -> Value {
        self.snapshot()
            .unwrap_or_else(|| Value::Object(Default::default()))
    }

    async fn save(&self, document: &Value) -> Result<()> {
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(StorageError::Status {
                status: 503,
                body: "save disabled".into(),
            });
        }
        let mut slot = self
            .document
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(document.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
