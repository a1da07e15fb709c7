use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid header: {0}")]
    HeaderError(String),

    #[error("Parsing error: {0}")]
    ParsingError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),
}

pub type ScraperResult<T> = Result<T, ScraperError>;
