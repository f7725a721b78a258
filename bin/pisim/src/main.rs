//! ---
//! ems_section: "11-simulation"
//! ems_subsection: "binary"
//! ems_type: "source"
//! ems_scope: "code"
//! ems_description: "Command line entrypoint for the transaction simulator."
//! ems_version: "v0.0.0-prealpha"
//! ems_owner: "tbd"
//! ---
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use pisim_common::config::AppConfig;
use pisim_common::logging::init_tracing;
use pisim_common::time::millis_to_rfc3339;
use pisim_sim::{Batch, TransactionGenerator};
use pisim_uplink::{report_outcome, BatchUploader, UploadOutcome};
use tokio::runtime::{Builder, Runtime};
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Simulate Raspberry Pi energy transactions and post them to a JSON storage bin",
    long_about = None
)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Storage endpoint URL (overrides config and PISIM_ENDPOINT)
    #[arg(long, value_name = "URL", global = true)]
    endpoint: Option<String>,

    /// Number of records in the batch
    #[arg(long, global = true)]
    count: Option<usize>,

    /// Seed for reproducible batches
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Pause after each generated record, in milliseconds
    #[arg(long, global = true)]
    pacing_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Commands {
    /// Generate a batch and upload it (default)
    Run,
    /// Generate a batch and print it as JSON without uploading
    Generate,
    /// Download the stored batch and print a summary
    Fetch,
}

impl Cli {
    fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(endpoint) = &self.endpoint {
            config.upload.endpoint = endpoint.clone();
        }
        if let Some(count) = self.count {
            config.generator.count = count;
        }
        if let Some(seed) = self.seed {
            config.generator.seed = Some(seed);
        }
        if let Some(pacing_ms) = self.pacing_ms {
            config.generator.pacing = Duration::from_millis(pacing_ms);
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let loaded = AppConfig::load_with_source(cli.config.as_deref())?;
    let mut config = loaded.config;
    config.apply_env_overrides();
    cli.apply_overrides(&mut config);

    init_tracing("pisim", &config.logging)?;
    info!(config_source = ?loaded.source, "configuration loaded");

    let mut stdout = io::stdout().lock();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => {
            execute_run(&config, &mut stdout)?;
        }
        Commands::Generate => execute_generate(&config, &mut stdout)?,
        Commands::Fetch => {
            execute_fetch(&config, &mut stdout)?;
        }
    }
    Ok(())
}

fn build_uploader(config: &AppConfig) -> Result<BatchUploader> {
    config.validate()?;
    let endpoint = config.upload.endpoint_url()?;
    BatchUploader::new(endpoint, config.upload.timeout).context("failed to prepare uploader")
}

fn runtime() -> Result<Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

fn generate(config: &AppConfig) -> Batch {
    TransactionGenerator::from_config(&config.generator).generate_batch(config.generator.count)
}

/// Generate, upload once and print the success line on HTTP 200.
fn execute_run(config: &AppConfig, out: &mut impl Write) -> Result<UploadOutcome> {
    let uploader = build_uploader(config)?;
    let batch = generate(config);
    info!(endpoint = %uploader.endpoint(), records = batch.len(), "uploading batch");
    let outcome = runtime()?.block_on(uploader.upload(&batch))?;
    report_outcome(outcome, out)?;
    Ok(outcome)
}

fn execute_generate(config: &AppConfig, out: &mut impl Write) -> Result<()> {
    config.generator.validate()?;
    let batch = generate(config);
    writeln!(out, "{}", batch.to_json_pretty()?)?;
    Ok(())
}

fn execute_fetch(config: &AppConfig, out: &mut impl Write) -> Result<Batch> {
    let uploader = build_uploader(config)?;
    info!(endpoint = %uploader.endpoint(), "fetching stored batch");
    let batch = runtime()?.block_on(uploader.fetch())?;
    let summary = batch.summary();
    info!(
        records = summary.records,
        consumer_from_prosumer = summary.consumer_from_prosumer,
        prosumer_from_sun = summary.prosumer_from_sun,
        total_quantity = summary.total_quantity,
        first = ?summary.first_timestamp_ms.and_then(rfc3339),
        last = ?summary.last_timestamp_ms.and_then(rfc3339),
        chronological = batch.is_chronological(),
        "stored batch retrieved"
    );
    writeln!(out, "{}", batch.to_json_pretty()?)?;
    Ok(batch)
}

fn rfc3339(millis: u64) -> Option<String> {
    i64::try_from(millis).ok().and_then(millis_to_rfc3339)
}
