//! Versioned, typed artifacts and write-once run records over a flat object bucket.

pub mod bucket;
pub mod errors;
pub mod manifest;
pub mod reference;
pub mod run;
pub mod s3;
pub mod store;

pub use bucket::{BucketError, BucketStore, LocalBucketStore};
pub use errors::{Result, StoreError};
pub use manifest::{ArtifactFile, ArtifactManifest, ArtifactVersion, LineageEntry};
pub use reference::{ArtifactRef, Selector};
pub use run::{ActiveRun, RunRecord};
pub use s3::{S3BucketStore, S3Config, DEFAULT_ARTIFACT_BUCKET};
pub use store::{compute_digest, ArtifactStore, NewArtifact, StagedArtifact};
