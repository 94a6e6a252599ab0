use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reference::Selector;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub name: String,
    /// Hex-encoded blake3 hash of the file contents.
    pub digest: String,
    pub size: u64,
    /// Bucket key of the blob. Blobs are addressed by digest, so a key never
    /// holds two different contents.
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactVersion {
    pub name: String,
    pub version: u32,
    pub artifact_type: String,
    pub description: String,
    pub files: Vec<ArtifactFile>,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub run_id: Uuid,
}

impl ArtifactVersion {
    pub fn qualified_name(&self) -> String {
        format!("{}:v{}", self.name, self.version)
    }

    pub fn lineage(&self) -> LineageEntry {
        LineageEntry {
            name: self.name.clone(),
            version: self.version,
            artifact_type: self.artifact_type.clone(),
        }
    }
}

/// One edge of a run's lineage: which artifact version it consumed or produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageEntry {
    pub name: String,
    pub version: u32,
    pub artifact_type: String,
}

impl LineageEntry {
    pub fn qualified_name(&self) -> String {
        format!("{}:v{}", self.name, self.version)
    }
}

/// Every published version of one artifact name, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactManifest {
    pub name: String,
    pub artifact_type: String,
    pub versions: Vec<ArtifactVersion>,
}

impl ArtifactManifest {
    pub fn new(name: impl Into<String>, artifact_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            artifact_type: artifact_type.into(),
            versions: Vec::new(),
        }
    }

    pub fn latest(&self) -> Option<&ArtifactVersion> {
        self.versions.iter().max_by_key(|v| v.version)
    }

    pub fn next_version(&self) -> u32 {
        self.latest().map(|v| v.version + 1).unwrap_or(0)
    }

    pub fn find(&self, selector: &Selector) -> Option<&ArtifactVersion> {
        match selector {
            Selector::Latest => self.latest(),
            Selector::Version(wanted) => self.versions.iter().find(|v| v.version == *wanted),
            Selector::Alias(alias) => self
                .versions
                .iter()
                .find(|v| v.aliases.iter().any(|a| a == alias)),
        }
    }

    /// Appends a version. An alias names at most one version, so the new version
    /// takes over any alias it shares with older ones.
    pub fn push(&mut self, version: ArtifactVersion) {
        for existing in &mut self.versions {
            existing
                .aliases
                .retain(|alias| !version.aliases.contains(alias));
        }
        self.versions.push(version);
    }
}

pub fn manifest_key(name: &str) -> String {
    format!("artifacts/{name}/manifest.json")
}

pub fn blob_key(name: &str, digest: &str) -> String {
    format!("artifacts/{name}/blobs/{digest}")
}

pub fn run_key(run_id: &Uuid) -> String {
    format!("runs/{run_id}.json")
}
