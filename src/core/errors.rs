use crate::core::fetcher::FetchError;
use crate::drivers::DriverError;
use crate::parser::ExtractionError;
use crate::storage::StorageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvestError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type HarvestResult<T> = Result<T, HarvestError>;
