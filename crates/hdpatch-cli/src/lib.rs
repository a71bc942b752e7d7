//! hdpatch command-line interface

use std::path::PathBuf;

use clap::Parser;
use hdpatch_core::{PatchError, Patcher, PatcherConfig, RunSummary};

/// Command-line arguments.
#[derive(Debug, Parser)]
#[command(name = "hdpatch")]
#[command(author, version, about = "hdpatch - apply incremental hdiff updates to a local game install")]
pub struct Cli {
    /// Working directory holding the update archives and the game folder
    #[arg(short, long, default_value = ".")]
    pub dir: PathBuf,

    /// Game folder name; detected from the known names when omitted
    #[arg(long)]
    pub game_folder: Option<String>,

    /// Archiver program (path or name on PATH)
    #[arg(long, env = "HDPATCH_ARCHIVER")]
    pub archiver: Option<PathBuf>,

    /// Binary-diff program (path or name on PATH)
    #[arg(long, env = "HDPATCH_DIFF_TOOL")]
    pub diff_tool: Option<PathBuf>,

    /// Keep transient artifacts and caches after patching
    #[arg(long)]
    pub no_cleanup: bool,

    /// Show debug output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Build the run configuration from the parsed arguments.
    pub fn config(&self) -> PatcherConfig {
        let mut config = PatcherConfig::new(&self.dir);
        config.game_folder.clone_from(&self.game_folder);
        if let Some(archiver) = &self.archiver {
            config.archiver.clone_from(archiver);
        }
        if let Some(diff_tool) = &self.diff_tool {
            config.diff_tool.clone_from(diff_tool);
        }
        config.cleanup = !self.no_cleanup;
        config
    }
}

/// Set up the real tools and run the patcher.
///
/// # Errors
///
/// Returns the first setup or diff failure.
pub fn patch(config: &PatcherConfig) -> Result<RunSummary, PatchError> {
    let patcher = Patcher::from_config(config)?;
    patcher.run()
}
