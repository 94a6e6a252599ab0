use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::manifest::{ArtifactVersion, LineageEntry};

/// Persisted description of one pipeline execution: its parameters and lineage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: Uuid,
    pub job_type: String,
    pub config: Value,
    pub inputs: Vec<LineageEntry>,
    pub outputs: Vec<LineageEntry>,
    pub summary: Value,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// In-flight run. Lineage accumulates here and is frozen by [`ActiveRun::finish`].
#[derive(Debug)]
pub struct ActiveRun {
    run_id: Uuid,
    job_type: String,
    config: Value,
    inputs: Vec<LineageEntry>,
    outputs: Vec<LineageEntry>,
    started_at: DateTime<Utc>,
}

impl ActiveRun {
    pub fn start(job_type: impl Into<String>, config: Value) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            job_type: job_type.into(),
            config,
            inputs: Vec::new(),
            outputs: Vec::new(),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.run_id
    }

    pub fn job_type(&self) -> &str {
        &self.job_type
    }

    pub fn use_artifact(&mut self, version: &ArtifactVersion) {
        self.inputs.push(version.lineage());
    }

    pub fn produce_artifact(&mut self, version: &ArtifactVersion) {
        self.outputs.push(version.lineage());
    }

    pub fn finish(self, summary: Value) -> RunRecord {
        RunRecord {
            run_id: self.run_id,
            job_type: self.job_type,
            config: self.config,
            inputs: self.inputs,
            outputs: self.outputs,
            summary,
            started_at: self.started_at,
            finished_at: Utc::now(),
        }
    }
}
