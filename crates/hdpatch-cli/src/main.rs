//! hdpatch - apply incremental hdiff updates to a local game install

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use hdpatch_cli::{Cli, patch};

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .without_time()
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))?;

    let config = cli.config();
    match patch(&config) {
        Ok(summary) => {
            tracing::debug!(
                "Processed {} archive(s), patched: {}",
                summary.archives.len(),
                summary.patched
            );
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            tracing::error!("{e}");
            if e.is_setup() {
                tracing::error!("Nothing was modified.");
            }
            Ok(ExitCode::FAILURE)
        }
    }
}
