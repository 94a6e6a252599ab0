//! Store configuration read from the process environment.

use std::path::PathBuf;
use std::sync::Arc;

use artifact_store::{ArtifactStore, BucketStore, LocalBucketStore, S3BucketStore, S3Config};
use tracing::info;

use crate::error::{CleaningError, Result};

pub const STORE_KIND_VAR: &str = "CLEANING_STORE_KIND";
pub const STORE_PATH_VAR: &str = "CLEANING_STORE_PATH";
pub const CACHE_DIR_VAR: &str = "CLEANING_CACHE_DIR";

const DEFAULT_STORE_PATH: &str = ".artifact-store";
const DEFAULT_CACHE_DIR: &str = ".artifact-cache";

#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    Local { root: PathBuf },
    S3(S3Config),
}

#[derive(Debug, Clone)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    pub cache_dir: PathBuf,
}

impl StoreSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let kind = var(STORE_KIND_VAR).unwrap_or_else(|| "local".to_string());
        let backend = match kind.trim().to_ascii_lowercase().as_str() {
            "local" => StoreBackend::Local {
                root: PathBuf::from(var(STORE_PATH_VAR).unwrap_or_else(|| DEFAULT_STORE_PATH.into())),
            },
            "s3" => {
                let defaults = S3Config::default();
                StoreBackend::S3(S3Config {
                    bucket: var("S3_BUCKET").ok_or_else(|| {
                        CleaningError::Config("S3_BUCKET must be set when CLEANING_STORE_KIND=s3".into())
                    })?,
                    region: var("S3_REGION").unwrap_or(defaults.region),
                    endpoint: var("S3_ENDPOINT_URL"),
                    access_key_id: var("S3_ACCESS_KEY_ID"),
                    secret_access_key: var("S3_SECRET_ACCESS_KEY"),
                    force_path_style: match var("S3_FORCE_PATH_STYLE") {
                        Some(raw) => parse_bool("S3_FORCE_PATH_STYLE", &raw)?,
                        None => defaults.force_path_style,
                    },
                })
            }
            other => {
                return Err(CleaningError::Config(format!(
                    "unknown {STORE_KIND_VAR} '{other}' (expected 'local' or 's3')"
                )))
            }
        };

        Ok(Self {
            backend,
            cache_dir: PathBuf::from(var(CACHE_DIR_VAR).unwrap_or_else(|| DEFAULT_CACHE_DIR.into())),
        })
    }

    pub async fn connect(&self) -> Result<ArtifactStore> {
        let bucket: Arc<dyn BucketStore> = match &self.backend {
            StoreBackend::Local { root } => {
                info!(root = %root.display(), "using local artifact store");
                Arc::new(LocalBucketStore::new(root.clone())?)
            }
            StoreBackend::S3(config) => {
                info!(bucket = %config.bucket, "using S3 artifact store");
                Arc::new(S3BucketStore::new(config.clone()).await?)
            }
        };
        Ok(ArtifactStore::new(bucket, self.cache_dir.clone()))
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(CleaningError::Config(format!(
            "{key} must be a boolean, got '{other}'"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn settings(vars: &[(&str, &str)]) -> Result<StoreSettings> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        StoreSettings::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_to_local_store() {
        let settings = settings(&[]).unwrap();
        assert_eq!(
            settings.backend,
            StoreBackend::Local {
                root: PathBuf::from(".artifact-store")
            }
        );
        assert_eq!(settings.cache_dir, PathBuf::from(".artifact-cache"));
    }

    #[test]
    fn reads_s3_settings() {
        let settings = settings(&[
            ("CLEANING_STORE_KIND", "S3"),
            ("S3_BUCKET", "pipeline-artifacts"),
            ("S3_ENDPOINT_URL", "http://localhost:9000"),
            ("S3_FORCE_PATH_STYLE", "1"),
        ])
        .unwrap();

        let StoreBackend::S3(config) = settings.backend else {
            panic!("expected s3 backend");
        };
        assert_eq!(config.bucket, "pipeline-artifacts");
        assert_eq!(config.region, "us-east-1");
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000"));
        assert!(config.force_path_style);
    }

    #[test]
    fn rejects_bad_configuration() {
        assert!(matches!(
            settings(&[("CLEANING_STORE_KIND", "gcs")]),
            Err(CleaningError::Config(_))
        ));
        assert!(matches!(
            settings(&[("CLEANING_STORE_KIND", "s3")]),
            Err(CleaningError::Config(_))
        ));
        assert!(matches!(
            settings(&[
                ("CLEANING_STORE_KIND", "s3"),
                ("S3_BUCKET", "b"),
                ("S3_FORCE_PATH_STYLE", "maybe"),
            ]),
            Err(CleaningError::Config(_))
        ));
    }
}
