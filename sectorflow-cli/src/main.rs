//! SectorFlow CLI — run the pipeline over the configured universe and write
//! the per-symbol result records as JSON for the presentation layer.

use anyhow::{Context, Result};
use clap::Parser;
use sectorflow_core::config::PipelineConfig;
use sectorflow_core::pipeline::Pipeline;
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sectorflow",
    about = "SectorFlow — sector trend states and reversal annotations"
)]
struct Args {
    /// Path to a TOML pipeline configuration. Built-in defaults when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Output path for the JSON result set, or "-" for stdout.
    #[arg(long, default_value = "sector_flow.json")]
    output: String,

    /// Ignore cached entries and re-fetch every symbol.
    #[arg(long, default_value_t = false)]
    refresh: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config.run.force_refresh = args.refresh;

    let pipeline = Pipeline::with_yahoo(config).context("building pipeline")?;
    let outcome = pipeline.run();

    if !outcome.benchmark_available {
        tracing::warn!("benchmark missing: relative metrics in this output are degraded");
    }
    for failure in &outcome.failures {
        tracing::warn!(symbol = %failure.ticker, error = %failure.error, "symbol omitted");
    }

    let json = serde_json::to_string_pretty(&outcome.records).context("serializing records")?;
    if args.output == "-" {
        std::io::stdout().write_all(json.as_bytes())?;
        println!();
    } else {
        std::fs::write(&args.output, json)
            .with_context(|| format!("writing {}", args.output))?;
        tracing::info!(
            records = outcome.records.len(),
            output = %args.output,
            "result set written"
        );
    }

    Ok(())
}
