//! Platform collaborators
//!
//! Thin wrappers over the host: a PowerShell runner for the trust and
//! network queries, and key-value stores addressed by a hierarchical key
//! plus a value name.

pub mod file_store;
pub mod powershell;
pub mod registry;

pub use file_store::FileStore;
pub use powershell::PowerShell;
pub use registry::RegistryStore;

use crate::error::MendResult;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stored value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum StoreValue {
    String(String),
    Dword(u32),
}

impl fmt::Display for StoreValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreValue::String(s) => write!(f, "{}", s),
            StoreValue::Dword(n) => write!(f, "{}", n),
        }
    }
}

/// Persistent key-value configuration store
#[allow(async_fn_in_trait)]
pub trait ConfigStore {
    /// Read a value, `None` when the key or value does not exist
    async fn read(&self, key: &str, name: &str) -> MendResult<Option<StoreValue>>;

    /// Create or overwrite a value
    async fn write(&mut self, key: &str, name: &str, value: &StoreValue) -> MendResult<()>;
}

/// Store selected at runtime
pub enum AnyStore {
    Registry(RegistryStore),
    File(FileStore),
}

impl ConfigStore for AnyStore {
    async fn read(&self, key: &str, name: &str) -> MendResult<Option<StoreValue>> {
        match self {
            AnyStore::Registry(store) => store.read(key, name).await,
            AnyStore::File(store) => store.read(key, name).await,
        }
    }

    async fn write(&mut self, key: &str, name: &str, value: &StoreValue) -> MendResult<()> {
        match self {
            AnyStore::Registry(store) => store.write(key, name, value).await,
            AnyStore::File(store) => store.write(key, name, value).await,
        }
    }
}
