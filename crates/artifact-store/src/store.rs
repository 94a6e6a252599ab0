use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::bucket::{BucketError, BucketStore};
use crate::errors::{Result, StoreError};
use crate::manifest::{
    blob_key, manifest_key, run_key, ArtifactFile, ArtifactManifest, ArtifactVersion,
};
use crate::reference::{is_valid_token, parse_selector, validate_name, ArtifactRef, Selector};
use crate::run::RunRecord;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Description of an artifact version that has not been published yet.
#[derive(Debug, Clone)]
pub struct NewArtifact {
    pub name: String,
    pub artifact_type: String,
    pub description: String,
    pub aliases: Vec<String>,
    pub files: Vec<PathBuf>,
}

impl NewArtifact {
    pub fn new(
        name: impl Into<String>,
        artifact_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            artifact_type: artifact_type.into(),
            description: description.into(),
            aliases: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn add_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    pub fn add_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }
}

/// Blobs are uploaded but the manifest does not list the version yet.
#[derive(Debug, Clone)]
pub struct StagedArtifact {
    version: ArtifactVersion,
}

impl StagedArtifact {
    pub fn version(&self) -> &ArtifactVersion {
        &self.version
    }
}

/// Versioned artifacts and run records on top of a [`BucketStore`], with a local
/// download cache.
#[derive(Clone)]
pub struct ArtifactStore {
    bucket: Arc<dyn BucketStore>,
    cache_dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(bucket: Arc<dyn BucketStore>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            bucket,
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub async fn manifest(&self, name: &str) -> Result<Option<ArtifactManifest>> {
        validate_name(name)?;
        let key = manifest_key(name);
        match self.bucket.get_object(&key).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|source| StoreError::Metadata { key, source }),
            Err(BucketError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn resolve(&self, reference: &ArtifactRef) -> Result<ArtifactVersion> {
        let manifest = self
            .manifest(&reference.name)
            .await?
            .ok_or_else(|| StoreError::ArtifactNotFound(reference.name.clone()))?;

        manifest
            .find(&reference.selector)
            .cloned()
            .ok_or_else(|| StoreError::VersionNotFound {
                name: reference.name.clone(),
                selector: reference.selector.to_string(),
            })
    }

    /// Resolves a single-file artifact and makes it available on local disk.
    pub async fn download_file(&self, reference: &ArtifactRef) -> Result<(ArtifactVersion, PathBuf)> {
        let version = self.resolve(reference).await?;
        let [file] = version.files.as_slice() else {
            return Err(StoreError::NotSingleFile {
                reference: version.qualified_name(),
                count: version.files.len(),
            });
        };

        let local_path = self
            .cache_dir
            .join(&version.name)
            .join(format!("v{}", version.version))
            .join(&file.name);

        if let Ok(cached) = tokio::fs::read(&local_path).await {
            if compute_digest(&cached) == file.digest {
                debug!(path = %local_path.display(), "using cached artifact file");
                return Ok((version.clone(), local_path));
            }
        }

        let bytes = self.bucket.get_object(&file.key).await?;
        let actual = compute_digest(&bytes);
        if actual != file.digest {
            return Err(StoreError::DigestMismatch {
                path: file.key.clone(),
                expected: file.digest.clone(),
                actual,
            });
        }

        write_atomically(&local_path, &bytes).await?;
        info!(
            artifact = %version.qualified_name(),
            bytes = file.size,
            "downloaded artifact file"
        );
        Ok((version.clone(), local_path))
    }

    /// Uploads the artifact's files and reserves the next free version number
    /// without making that version visible.
    pub async fn stage(&self, artifact: NewArtifact, run_id: Uuid) -> Result<StagedArtifact> {
        let NewArtifact {
            name,
            artifact_type,
            description,
            aliases,
            files,
        } = artifact;

        validate_name(&name)?;
        for alias in &aliases {
            if !matches!(parse_selector(alias), Some(Selector::Alias(_))) {
                return Err(StoreError::InvalidName(alias.clone()));
            }
        }
        if files.is_empty() {
            return Err(StoreError::EmptyArtifact(name));
        }

        let manifest = self
            .manifest(&name)
            .await?
            .unwrap_or_else(|| ArtifactManifest::new(&name, &artifact_type));
        check_type(&manifest, &artifact_type)?;
        let version_number = manifest.next_version();

        let mut seen = HashSet::new();
        let mut entries = Vec::with_capacity(files.len());
        for path in &files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .filter(|n| is_valid_token(n))
                .ok_or_else(|| StoreError::InvalidName(path.display().to_string()))?;
            if !seen.insert(file_name.clone()) {
                return Err(StoreError::DuplicateFile {
                    name,
                    file: file_name,
                });
            }

            let contents = tokio::fs::read(path)
                .await
                .map_err(|err| StoreError::io(path, err))?;
            let digest = compute_digest(&contents);
            let entry = ArtifactFile {
                key: blob_key(&name, &digest),
                digest,
                size: contents.len() as u64,
                name: file_name,
            };

            // Same key means same bytes, so an upload never clobbers a published blob.
            if !self.bucket.exists(&entry.key).await? {
                self.bucket
                    .put_object(&entry.key, Bytes::from(contents), content_type_for(&entry.name))
                    .await?;
                debug!(key = %entry.key, "uploaded artifact blob");
            }
            entries.push(entry);
        }

        Ok(StagedArtifact {
            version: ArtifactVersion {
                name,
                version: version_number,
                artifact_type,
                description,
                files: entries,
                aliases,
                created_at: Utc::now(),
                run_id,
            },
        })
    }

    /// Publishes a staged version by rewriting the manifest. This is the only
    /// step that makes a new version visible.
    pub async fn commit(&self, staged: StagedArtifact) -> Result<ArtifactVersion> {
        let version = staged.version;
        let mut manifest = self
            .manifest(&version.name)
            .await?
            .unwrap_or_else(|| ArtifactManifest::new(&version.name, &version.artifact_type));
        check_type(&manifest, &version.artifact_type)?;
        if manifest.next_version() != version.version {
            return Err(StoreError::VersionConflict {
                name: version.name,
                version: version.version,
            });
        }

        manifest.push(version.clone());
        let key = manifest_key(&version.name);
        self.put_json(&key, &manifest).await?;
        info!(artifact = %version.qualified_name(), "published artifact");
        Ok(version)
    }

    pub async fn publish(&self, artifact: NewArtifact, run_id: Uuid) -> Result<ArtifactVersion> {
        let staged = self.stage(artifact, run_id).await?;
        self.commit(staged).await
    }

    /// Run records are written exactly once.
    pub async fn log_run(&self, record: &RunRecord) -> Result<()> {
        let key = run_key(&record.run_id);
        if self.bucket.exists(&key).await? {
            return Err(StoreError::RunExists(record.run_id));
        }
        self.put_json(&key, record).await?;
        debug!(run_id = %record.run_id, "recorded run");
        Ok(())
    }

    pub async fn load_run(&self, run_id: Uuid) -> Result<RunRecord> {
        let key = run_key(&run_id);
        let bytes = match self.bucket.get_object(&key).await {
            Ok(bytes) => bytes,
            Err(BucketError::NotFound(_)) => return Err(StoreError::RunNotFound(run_id)),
            Err(err) => return Err(err.into()),
        };
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Metadata { key, source })
    }

    async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let body = serde_json::to_vec_pretty(value).map_err(|source| StoreError::Metadata {
            key: key.to_string(),
            source,
        })?;
        self.bucket
            .put_object(key, Bytes::from(body), JSON_CONTENT_TYPE)
            .await?;
        Ok(())
    }
}

fn check_type(manifest: &ArtifactManifest, requested: &str) -> Result<()> {
    if manifest.artifact_type != requested {
        return Err(StoreError::TypeMismatch {
            name: manifest.name.clone(),
            existing: manifest.artifact_type.clone(),
            requested: requested.to_string(),
        });
    }
    Ok(())
}

fn content_type_for(file_name: &str) -> &'static str {
    match Path::new(file_name).extension().and_then(|ext| ext.to_str()) {
        Some("csv") => "text/csv",
        Some("json") => JSON_CONTENT_TYPE,
        _ => "application/octet-stream",
    }
}

pub fn compute_digest(contents: &[u8]) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(contents);
    hasher.finalize().to_hex().to_string()
}

async fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| StoreError::io(parent, err))?;
    }
    let staging = path.with_extension(format!("{}.partial", Uuid::new_v4()));
    tokio::fs::write(&staging, contents)
        .await
        .map_err(|err| StoreError::io(&staging, err))?;
    tokio::fs::rename(&staging, path)
        .await
        .map_err(|err| StoreError::io(path, err))
}
