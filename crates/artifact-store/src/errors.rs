use std::io;
use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

use crate::bucket::BucketError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid artifact reference '{reference}': {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error("invalid artifact name '{0}': use letters, digits, '.', '-' or '_'")]
    InvalidName(String),

    #[error("artifact '{0}' does not exist")]
    ArtifactNotFound(String),

    #[error("artifact '{name}' has no version matching '{selector}'")]
    VersionNotFound { name: String, selector: String },

    #[error("artifact '{reference}' holds {count} files; expected exactly one")]
    NotSingleFile { reference: String, count: usize },

    #[error("artifact '{name}' is of type '{existing}' and cannot take a '{requested}' version")]
    TypeMismatch {
        name: String,
        existing: String,
        requested: String,
    },

    #[error("artifact '{0}' must contain at least one file")]
    EmptyArtifact(String),

    #[error("artifact '{name}' lists file '{file}' more than once")]
    DuplicateFile { name: String, file: String },

    #[error("version v{version} of '{name}' was taken by a concurrent publish")]
    VersionConflict { name: String, version: u32 },

    #[error("digest mismatch for {path}: expected {expected}, got {actual}")]
    DigestMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("run {0} is already recorded")]
    RunExists(Uuid),

    #[error("run {0} does not exist")]
    RunNotFound(Uuid),

    #[error(transparent)]
    Bucket(#[from] BucketError),

    #[error("i/o error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed metadata in {key}: {source}")]
    Metadata {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
