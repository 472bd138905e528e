// Key-value storage abstraction.
//
// All persistent state lives behind this trait: one logical table per key,
// values serialized as JSON text. An in-memory implementation backs tests and
// single-process deployments; alternative backends implement the same trait.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Errors from storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage backend failure: {0}")]
    Backend(String),

    #[error("stored value for key `{key}` is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
}

/// A namespaced key-value storage backend.
///
/// Implementations must be safe to share across tasks; writers replace whole
/// values so readers always observe a fully-constructed state.
#[async_trait]
pub trait StorageBackend: Send + Sync + std::fmt::Debug {
    /// Get a value by key. `None` if the key has never been written.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Set a key to a value, replacing any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a key. Removing an absent key is a no-op.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage backed by a `HashMap`.
///
/// Cloning shares the underlying map, so a test can keep a handle for
/// inspection while the service owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    map: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub async fn len(&self) -> usize {
        self.map.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.map.read().await.is_empty()
    }

    /// Drop all keys.
    pub async fn clear(&self) {
        self.map.write().await.clear();
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.map.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.map.write().await.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.map.write().await.remove(key);
        Ok(())
    }
}
