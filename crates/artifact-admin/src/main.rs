use std::path::PathBuf;

use anyhow::{Context, Result};
use artifact_store::{ActiveRun, ArtifactRef, ArtifactStore, NewArtifact};
use clap::{Args, Parser, Subcommand};
use cleaning_core::settings::StoreSettings;
use serde_json::json;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const UPLOAD_JOB_TYPE: &str = "upload";

#[derive(Parser, Debug)]
#[command(author, version, about = "Artifact store administrative tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Publish local files as a new version of an artifact
    LogArtifact(LogArtifactArgs),
    /// List every version of an artifact
    List {
        /// Artifact name
        name: String,
    },
    /// Print one artifact version as JSON
    Show {
        /// Artifact reference, e.g. `sample.csv:latest`
        reference: String,
    },
    /// Print a run record as JSON
    Run {
        run_id: Uuid,
    },
}

#[derive(Args, Debug)]
struct LogArtifactArgs {
    /// Artifact name
    #[arg(long)]
    name: String,
    /// Artifact type tag, fixed by the first version
    #[arg(long = "type")]
    artifact_type: String,
    /// Human-readable description
    #[arg(long)]
    description: String,
    /// Extra aliases to attach to the new version
    #[arg(long = "alias")]
    aliases: Vec<String>,
    /// Files to include
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let store = StoreSettings::from_env()
        .context("invalid artifact store configuration")?
        .connect()
        .await
        .context("failed to configure artifact store")?;

    match cli.command {
        Command::LogArtifact(args) => handle_log_artifact(&store, args).await,
        Command::List { name } => handle_list(&store, &name).await,
        Command::Show { reference } => handle_show(&store, &reference).await,
        Command::Run { run_id } => handle_run(&store, run_id).await,
    }
}

async fn handle_log_artifact(store: &ArtifactStore, args: LogArtifactArgs) -> Result<()> {
    let mut run = ActiveRun::start(
        UPLOAD_JOB_TYPE,
        json!({
            "name": args.name,
            "type": args.artifact_type,
            "description": args.description,
            "aliases": args.aliases,
            "files": args.files,
        }),
    );

    let mut artifact = NewArtifact::new(&args.name, &args.artifact_type, &args.description);
    artifact.aliases = args.aliases;
    artifact.files = args.files;

    let staged = store
        .stage(artifact, run.id())
        .await
        .context("failed to upload artifact files")?;
    run.produce_artifact(staged.version());
    let record = run.finish(json!({ "files": staged.version().files.len() }));
    let version = store.commit(staged).await.context("failed to publish artifact")?;
    store.log_run(&record).await.context("failed to record upload run")?;

    info!(run_id = %record.run_id, "upload run recorded");
    println!("Published {} ({} files)", version.qualified_name(), version.files.len());
    Ok(())
}

async fn handle_list(store: &ArtifactStore, name: &str) -> Result<()> {
    let Some(manifest) = store.manifest(name).await? else {
        println!("No artifact named '{name}'.");
        return Ok(());
    };

    let latest = manifest.latest().map(|v| v.version);
    println!("{} (type '{}')", manifest.name, manifest.artifact_type);
    for version in &manifest.versions {
        let mut aliases = version.aliases.clone();
        if Some(version.version) == latest {
            aliases.insert(0, "latest".to_string());
        }
        println!(
            "  v{:<4} {:<20} files={} run={} {}",
            version.version,
            aliases.join(","),
            version.files.len(),
            version.run_id,
            version.created_at.to_rfc3339()
        );
    }
    Ok(())
}

async fn handle_show(store: &ArtifactStore, reference: &str) -> Result<()> {
    let reference = ArtifactRef::parse(reference)?;
    let version = store.resolve(&reference).await?;
    println!("{}", serde_json::to_string_pretty(&version)?);
    Ok(())
}

async fn handle_run(store: &ArtifactStore, run_id: Uuid) -> Result<()> {
    let record = store.load_run(run_id).await?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
