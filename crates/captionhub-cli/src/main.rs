//! captionhub: upload images to the DAM with AI-generated alt text.
//!
//! Configuration comes from the environment (or `.env`): DAM_BASE_URL,
//! DAM_CLIENT_ID, DAM_CLIENT_SECRET and OPENAI_API_KEY are required.

use anyhow::Context;
use captionhub_cli::{build_orchestrator, enqueue_paths, init_tracing, validate_paths};
use captionhub_core::{BatchStatus, FileLimits, FileValidator, IngestConfig};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "captionhub", about = "Caption and upload images to the DAM")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload images as one batch, captioning each one
    Upload {
        /// Image files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Maximum number of files processed at once (default: all)
        #[arg(long)]
        max_concurrency: Option<usize>,
        /// Leave out files that fail intake validation instead of aborting
        #[arg(long)]
        skip_invalid: bool,
    },
    /// Check files against the intake limits without uploading
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Upload {
            files,
            max_concurrency,
            skip_invalid,
        } => {
            let mut config = IngestConfig::from_env().context(
                "Failed to load configuration. Set DAM_BASE_URL, DAM_CLIENT_ID, DAM_CLIENT_SECRET and OPENAI_API_KEY",
            )?;
            if max_concurrency.is_some() {
                config.max_concurrency = max_concurrency;
                config.validate()?;
            }

            let mut orchestrator = build_orchestrator(&config)?;
            enqueue_paths(&mut orchestrator, &files, skip_invalid).await?;

            let report = match orchestrator.submit().await {
                Some(report) => report.clone(),
                None => anyhow::bail!("No valid files to upload"),
            };

            let written = orchestrator.flush_enrichment().await;
            tracing::debug!(metadata_writes = written, "Metadata writes flushed");

            print_json(&report)?;
            if report.status == BatchStatus::Failed {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Validate { files } => {
            let limits = FileLimits::from_env().context("Invalid intake limits")?;
            let validator = FileValidator::from_limits(&limits);
            let verdicts = validate_paths(&files, &validator).await;

            print_json(&verdicts)?;
            if verdicts.iter().any(|v| !v.valid) {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
