use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Storage operation error: {0}")]
    OperationError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<std::io::Error> for StorageError {
    fn from(error: std::io::Error) -> Self {
        StorageError::OperationError(error.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(error: serde_json::Error) -> Self {
        StorageError::SerializationError(error.to_string())
    }
}

/// Output sink for scraped items. Items arrive already serialized to JSON.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn store(&self, item: Value) -> Result<(), StorageError>;

    async fn flush(&self) -> Result<(), StorageError> {
        Ok(())
    }
}
