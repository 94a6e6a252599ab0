// crates/cleaning-core/src/error.rs

use artifact_store::{BucketError, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CleaningError {
    #[error("Artifact store error: {0}")]
    Store(#[from] StoreError),

    #[error("Bucket backend error: {0}")]
    Bucket(#[from] BucketError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Dataset is missing required column '{0}'")]
    MissingColumn(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, CleaningError>;
