use std::env;

use anyhow::{Context, Result};
use clap::Parser;
use cleaning_core::settings::StoreSettings;
use cleaning_core::{run_basic_cleaning, StageParams};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// A very basic data cleaning step: drop price and location outliers from a
/// dataset artifact and publish the result as a new artifact.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// The input artifact, as `name[:version|alias]`
    #[arg(long = "input_artifact")]
    input_artifact: String,

    /// The name for the output artifact
    #[arg(long = "output_artifact")]
    output_artifact: String,

    /// The type for the output artifact
    #[arg(long = "output_type")]
    output_type: String,

    /// A description for the output artifact
    #[arg(long = "output_description")]
    output_description: String,

    /// The minimum price to consider
    #[arg(long = "min_price", allow_negative_numbers = true)]
    min_price: f64,

    /// The maximum price to consider
    #[arg(long = "max_price", allow_negative_numbers = true)]
    max_price: f64,
}

impl From<Cli> for StageParams {
    fn from(cli: Cli) -> Self {
        StageParams {
            input_artifact: cli.input_artifact,
            output_artifact: cli.output_artifact,
            output_type: cli.output_type,
            output_description: cli.output_description,
            min_price: cli.min_price,
            max_price: cli.max_price,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let params = StageParams::from(Cli::parse());

    let settings = StoreSettings::from_env().context("invalid artifact store configuration")?;
    let store = settings
        .connect()
        .await
        .context("failed to configure artifact store")?;
    let work_dir = env::current_dir().context("cannot determine working directory")?;

    let outcome = run_basic_cleaning(&store, &params, &work_dir)
        .await
        .with_context(|| format!("basic cleaning of '{}' failed", params.input_artifact))?;

    info!(
        run_id = %outcome.run_id,
        input = %outcome.input.qualified_name(),
        output = %outcome.output.qualified_name(),
        rows = outcome.report.kept_rows(),
        "basic cleaning finished"
    );
    Ok(())
}
