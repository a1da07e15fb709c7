use super::base::{StorageBackend, StorageError};
use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writes one JSON object per line, either to a file or to stdout.
pub struct JsonLinesStorage {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesStorage {
    /// Creates (or truncates) `path`, creating missing parent directories.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        debug!("Writing items to {}", path.display());
        Ok(Self::from_writer(BufWriter::new(file)))
    }

    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            writer: Mutex::new(Box::new(writer)),
        }
    }

    fn write_line(&self, item: &Value) -> Result<(), StorageError> {
        let line = serde_json::to_string(item)?;
        let mut writer = self.writer.lock();
        writer.write_all(line.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for JsonLinesStorage {
    async fn store(&self, item: Value) -> Result<(), StorageError> {
        self.write_line(&item)
    }

    async fn flush(&self) -> Result<(), StorageError> {
        self.writer.lock().flush()?;
        Ok(())
    }
}
