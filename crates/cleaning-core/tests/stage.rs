use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use artifact_store::{
    compute_digest, ArtifactRef, ArtifactStore, BucketError, BucketStore, LocalBucketStore,
    NewArtifact, StoreError,
};
use async_trait::async_trait;
use bytes::Bytes;
use cleaning_core::{run_basic_cleaning, CleaningError, StageParams, CLEAN_SAMPLE_FILE, JOB_TYPE};
use polars::prelude::*;
use tempfile::TempDir;
use uuid::Uuid;

struct Harness {
    _dir: TempDir,
    store: ArtifactStore,
    work_dir: PathBuf,
    root: PathBuf,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let root = dir.path().to_path_buf();
    let work_dir = root.join("work");
    std::fs::create_dir_all(&work_dir).expect("work dir");
    let bucket = LocalBucketStore::new(root.join("store")).expect("bucket");
    let store = ArtifactStore::new(Arc::new(bucket), root.join("cache"));
    Harness {
        _dir: dir,
        store,
        work_dir,
        root,
    }
}

fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name)
}

async fn seed_raw(h: &Harness, file: &Path) {
    h.store
        .publish(
            NewArtifact::new("sample.csv", "raw_data", "Raw listings export").add_file(file),
            Uuid::new_v4(),
        )
        .await
        .expect("seed raw artifact");
}

fn params(min_price: f64, max_price: f64) -> StageParams {
    StageParams {
        input_artifact: "sample.csv:latest".into(),
        output_artifact: "clean_sample.csv".into(),
        output_type: "clean_sample".into(),
        output_description: "Data with outliers and null values removed".into(),
        min_price,
        max_price,
    }
}

fn numeric(df: &DataFrame, name: &str) -> Vec<f64> {
    df.column(name)
        .expect("column")
        .cast(&DataType::Float64)
        .expect("cast")
        .f64()
        .expect("f64")
        .into_no_null_iter()
        .collect()
}

#[tokio::test]
async fn publishes_filtered_listings() -> Result<()> {
    let h = harness();
    seed_raw(&h, &fixture_path("listings.csv")).await;

    let outcome = run_basic_cleaning(&h.store, &params(10.0, 350.0), &h.work_dir).await?;

    assert_eq!(outcome.input.qualified_name(), "sample.csv:v0");
    assert_eq!(outcome.output.qualified_name(), "clean_sample.csv:v0");
    assert_eq!(outcome.output.artifact_type, "clean_sample");
    assert_eq!(outcome.local_path, h.work_dir.join(CLEAN_SAMPLE_FILE));
    assert_eq!(outcome.report.input_rows, 14);
    assert_eq!(outcome.report.after_price_filter, 11);
    assert_eq!(outcome.report.dropped_price, 3);
    assert_eq!(outcome.report.dropped_geo, 2);
    assert_eq!(outcome.report.kept_rows(), 9);

    let published = h
        .store
        .resolve(&ArtifactRef::parse("clean_sample.csv:latest")?)
        .await?;
    assert_eq!(published.description, "Data with outliers and null values removed");
    assert_eq!(published.run_id, outcome.run_id);
    let local_bytes = std::fs::read(&outcome.local_path)?;
    assert_eq!(published.files[0].digest, compute_digest(&local_bytes));

    let cleaned = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(outcome.local_path.clone()))?
        .finish()?;
    assert_eq!(cleaned.height(), 9);
    assert!(numeric(&cleaned, "price").iter().all(|p| (10.0..=350.0).contains(p)));
    assert!(numeric(&cleaned, "longitude")
        .iter()
        .all(|lon| (-74.25..=-73.50).contains(lon)));
    assert!(numeric(&cleaned, "latitude")
        .iter()
        .all(|lat| (40.5..=41.2).contains(lat)));

    Ok(())
}

#[tokio::test]
async fn kept_rows_are_byte_identical_and_in_order() -> Result<()> {
    let h = harness();
    let fixture = fixture_path("listings.csv");
    seed_raw(&h, &fixture).await;

    let outcome = run_basic_cleaning(&h.store, &params(10.0, 350.0), &h.work_dir).await?;

    let kept_ids = [
        "2539", "2595", "3647", "3831", "5022", "5099", "5121", "5178", "6021",
    ];
    let original = std::fs::read_to_string(&fixture)?;
    let mut lines = original.lines();
    let header = lines.next().expect("header");
    let mut expected = format!("{header}\n");
    for line in lines.filter(|line| kept_ids.iter().any(|id| line.starts_with(&format!("{id},")))) {
        expected.push_str(line);
        expected.push('\n');
    }

    assert_eq!(std::fs::read_to_string(&outcome.local_path)?, expected);
    Ok(())
}

#[tokio::test]
async fn records_run_lineage_and_config() -> Result<()> {
    let h = harness();
    seed_raw(&h, &fixture_path("listings.csv")).await;

    let outcome = run_basic_cleaning(&h.store, &params(10.0, 350.0), &h.work_dir).await?;
    let record = h.store.load_run(outcome.run_id).await?;

    assert_eq!(record.job_type, JOB_TYPE);
    assert_eq!(record.config["input_artifact"], "sample.csv:latest");
    assert_eq!(record.config["min_price"], 10.0);
    assert_eq!(record.config["max_price"], 350.0);
    assert_eq!(record.inputs, vec![outcome.input.clone()]);
    assert_eq!(record.outputs, vec![outcome.output.clone()]);
    assert_eq!(record.summary["after_geo_filter"], 9);
    assert!(record.finished_at >= record.started_at);
    Ok(())
}

#[tokio::test]
async fn inverted_price_bounds_publish_an_empty_dataset() -> Result<()> {
    let h = harness();
    seed_raw(&h, &fixture_path("listings.csv")).await;

    let outcome = run_basic_cleaning(&h.store, &params(350.0, 10.0), &h.work_dir).await?;

    assert_eq!(outcome.report.kept_rows(), 0);
    let written = std::fs::read_to_string(&outcome.local_path)?;
    assert_eq!(written.lines().count(), 1, "only the header remains");
    assert!(written.starts_with("id,name,host_id,"));
    Ok(())
}

#[tokio::test]
async fn reruns_publish_identical_content_as_new_versions() -> Result<()> {
    let h = harness();
    seed_raw(&h, &fixture_path("listings.csv")).await;

    let first = run_basic_cleaning(&h.store, &params(10.0, 350.0), &h.work_dir).await?;
    let second = run_basic_cleaning(&h.store, &params(10.0, 350.0), &h.work_dir).await?;

    assert_eq!(first.output.version, 0);
    assert_eq!(second.output.version, 1);
    assert_ne!(first.run_id, second.run_id);

    let manifest = h
        .store
        .manifest("clean_sample.csv")
        .await?
        .expect("manifest");
    assert_eq!(manifest.versions.len(), 2);
    assert_eq!(
        manifest.versions[0].files[0].digest,
        manifest.versions[1].files[0].digest
    );
    Ok(())
}

#[tokio::test]
async fn keeps_and_drops_reference_rows() -> Result<()> {
    let h = harness();
    let raw = h.root.join("examples.csv");
    std::fs::write(
        &raw,
        "price,longitude,latitude\n150,-73.9,40.7\n10,-73.9,40.7\n150,-80.0,40.7\n",
    )?;
    seed_raw(&h, &raw).await;

    let outcome = run_basic_cleaning(&h.store, &params(50.0, 200.0), &h.work_dir).await?;

    assert_eq!(
        std::fs::read_to_string(&outcome.local_path)?,
        "price,longitude,latitude\n150,-73.9,40.7\n"
    );
    Ok(())
}

#[tokio::test]
async fn unknown_input_artifact_publishes_nothing() {
    let h = harness();

    let err = run_basic_cleaning(&h.store, &params(10.0, 350.0), &h.work_dir)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CleaningError::Store(StoreError::ArtifactNotFound(ref name)) if name == "sample.csv"
    ));
    assert!(h.store.manifest("clean_sample.csv").await.unwrap().is_none());
    assert!(!h.work_dir.join(CLEAN_SAMPLE_FILE).exists());
}

#[tokio::test]
async fn missing_required_column_publishes_nothing() {
    let h = harness();
    let raw = h.root.join("no_latitude.csv");
    std::fs::write(&raw, "id,price,longitude\n1,100,-73.9\n").unwrap();
    seed_raw(&h, &raw).await;

    let err = run_basic_cleaning(&h.store, &params(10.0, 350.0), &h.work_dir)
        .await
        .unwrap_err();

    assert!(matches!(err, CleaningError::MissingColumn(ref column) if column == "latitude"));
    assert!(h.store.manifest("clean_sample.csv").await.unwrap().is_none());
}

#[tokio::test]
async fn type_conflict_on_output_publishes_nothing() {
    let h = harness();
    seed_raw(&h, &fixture_path("listings.csv")).await;

    let mut conflicting = params(10.0, 350.0);
    conflicting.output_artifact = "sample.csv".into();

    let err = run_basic_cleaning(&h.store, &conflicting, &h.work_dir)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CleaningError::Store(StoreError::TypeMismatch { .. })
    ));
    let manifest = h.store.manifest("sample.csv").await.unwrap().unwrap();
    assert_eq!(manifest.versions.len(), 1);
}

/// Local bucket that refuses writes to one key.
struct RejectingBucket {
    inner: LocalBucketStore,
    rejected_key: String,
}

#[async_trait]
impl BucketStore for RejectingBucket {
    async fn put_object(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
    ) -> Result<(), BucketError> {
        if key == self.rejected_key {
            return Err(BucketError::Sdk(format!("write to {key} rejected")));
        }
        self.inner.put_object(key, bytes, content_type).await
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, BucketError> {
        self.inner.get_object(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, BucketError> {
        self.inner.exists(key).await
    }
}

#[tokio::test]
async fn failed_commit_leaves_no_run_record() {
    let h = harness();
    seed_raw(&h, &fixture_path("listings.csv")).await;

    let bucket = RejectingBucket {
        inner: LocalBucketStore::new(h.root.join("store")).unwrap(),
        rejected_key: "artifacts/clean_sample.csv/manifest.json".into(),
    };
    let store = ArtifactStore::new(Arc::new(bucket), h.root.join("cache"));

    let err = run_basic_cleaning(&store, &params(10.0, 350.0), &h.work_dir)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CleaningError::Store(StoreError::Bucket(BucketError::Sdk(_)))
    ));
    assert!(!h.root.join("store/runs").exists());
    assert!(h.store.manifest("clean_sample.csv").await.unwrap().is_none());
}
