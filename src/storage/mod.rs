pub mod base;
pub mod jsonl;
pub mod memory;

pub use base::{StorageBackend, StorageError};
pub use jsonl::JsonLinesStorage;
pub use memory::MemoryStorage;
