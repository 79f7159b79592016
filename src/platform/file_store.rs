//! JSON-file-backed store
//!
//! Mirrors the registry layout (key path → value name → value) in a single
//! file. Used on hosts without a registry and in tests.

use super::{ConfigStore, StoreValue};
use crate::error::{MendError, MendResult};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::info;

type Layout = BTreeMap<String, BTreeMap<String, StoreValue>>;

/// Store persisted as pretty-printed JSON
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn load(&self) -> MendResult<Layout> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) if contents.trim().is_empty() => Ok(Layout::new()),
            Ok(contents) => serde_json::from_str(&contents).map_err(|e| {
                MendError::ProbeUnavailable(format!("corrupt store {:?}: {}", self.path, e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Layout::new()),
            Err(e) => Err(MendError::ProbeUnavailable(format!(
                "cannot read store {:?}: {}",
                self.path, e
            ))),
        }
    }
}

impl ConfigStore for FileStore {
    async fn read(&self, key: &str, name: &str) -> MendResult<Option<StoreValue>> {
        let layout = self.load().await?;
        Ok(layout.get(key).and_then(|values| values.get(name)).cloned())
    }

    async fn write(&mut self, key: &str, name: &str, value: &StoreValue) -> MendResult<()> {
        let mut layout = self
            .load()
            .await
            .map_err(|e| MendError::ApplyFailed(e.to_string()))?;
        layout
            .entry(key.to_string())
            .or_default()
            .insert(name.to_string(), value.clone());

        let json = serde_json::to_string_pretty(&layout)
            .map_err(|e| MendError::ApplyFailed(format!("cannot encode store: {}", e)))?;
        tokio::fs::write(&self.path, json).await.map_err(|e| {
            MendError::ApplyFailed(format!("cannot write store {:?}: {}", self.path, e))
        })?;

        info!("Store {}\\{} set to {}", key, name, value);
        Ok(())
    }
}
