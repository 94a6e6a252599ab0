use std::path::{Path, PathBuf};

use artifact_store::reference::validate_name;
use artifact_store::{ActiveRun, ArtifactRef, ArtifactStore, LineageEntry, NewArtifact};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::dataset;
use crate::error::Result;
use crate::quality_filters::{apply_outlier_filters, CleaningReport, PriceRange, NYC_BOUNDS};

pub const JOB_TYPE: &str = "basic_cleaning";
pub const CLEAN_SAMPLE_FILE: &str = "clean_sample.csv";

/// Parameters of one cleaning run; recorded verbatim as the run's config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageParams {
    pub input_artifact: String,
    pub output_artifact: String,
    pub output_type: String,
    pub output_description: String,
    pub min_price: f64,
    pub max_price: f64,
}

impl StageParams {
    pub fn price_range(&self) -> PriceRange {
        PriceRange::new(self.min_price, self.max_price)
    }
}

#[derive(Debug, Clone)]
pub struct StageOutcome {
    pub run_id: Uuid,
    pub input: LineageEntry,
    pub output: LineageEntry,
    pub report: CleaningReport,
    pub local_path: PathBuf,
}

/// Downloads the input artifact, drops price and location outliers, writes
/// `clean_sample.csv` into `work_dir` and publishes it as a new version of the
/// output artifact.
///
/// The output version only becomes visible once everything else has succeeded:
/// blobs are uploaded first, then the manifest, then the run record.
pub async fn run_basic_cleaning(
    store: &ArtifactStore,
    params: &StageParams,
    work_dir: &Path,
) -> Result<StageOutcome> {
    let input_ref = ArtifactRef::parse(&params.input_artifact)?;
    validate_name(&params.output_artifact)?;

    let mut run = ActiveRun::start(JOB_TYPE, serde_json::to_value(params)?);
    info!(run_id = %run.id(), job_type = run.job_type(), "started run");

    info!(artifact = %input_ref, "downloading raw data");
    let (input_version, input_path) = store.download_file(&input_ref).await?;
    run.use_artifact(&input_version);

    info!(path = %input_path.display(), "loading raw data");
    let raw = dataset::read_csv(&input_path)?;

    info!(
        min_price = params.min_price,
        max_price = params.max_price,
        "dropping outliers"
    );
    let (mut cleaned, report) = apply_outlier_filters(raw, params.price_range(), NYC_BOUNDS)?;
    info!(
        input_rows = report.input_rows,
        dropped_price = report.dropped_price,
        dropped_geo = report.dropped_geo,
        kept_rows = report.kept_rows(),
        "outliers dropped"
    );

    let local_path = work_dir.join(CLEAN_SAMPLE_FILE);
    dataset::write_csv(&mut cleaned, &local_path)?;

    info!(artifact = %params.output_artifact, "uploading cleaned file");
    let artifact = NewArtifact::new(
        &params.output_artifact,
        &params.output_type,
        &params.output_description,
    )
    .add_file(&local_path);
    let staged = store.stage(artifact, run.id()).await?;
    run.produce_artifact(staged.version());

    let record = run.finish(serde_json::to_value(&report)?);
    // A run record must only name versions that exist, so it follows the commit.
    let output_version = store.commit(staged).await?;
    store.log_run(&record).await?;

    Ok(StageOutcome {
        run_id: record.run_id,
        input: input_version.lineage(),
        output: output_version.lineage(),
        report,
        local_path,
    })
}
