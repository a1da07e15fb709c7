use super::base::{StorageBackend, StorageError};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;

/// Keeps every item in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    items: Arc<RwLock<Vec<Value>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> Vec<Value> {
        self.items.read().clone()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorage {
    async fn store(&self, item: Value) -> Result<(), StorageError> {
        self.items.write().push(item);
        Ok(())
    }
}
