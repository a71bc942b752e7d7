//! Domain-specific errors for patch operations

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failure of an external collaborator (archiver or binary-diff tool).
#[derive(Error, Debug)]
pub enum ToolError {
    /// The tool could not be located on disk or on `PATH`.
    #[error("'{tool}' not found")]
    NotFound {
        /// Program name or path that was looked up.
        tool: String,
    },

    /// The child process could not be started.
    #[error("Failed to spawn {tool}: {source}")]
    Spawn {
        /// Program that failed to start.
        tool: String,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The child process ran but exited unsuccessfully.
    #[error("{tool} exited with {}: {stderr}", describe_exit(.code))]
    Failed {
        /// Program that failed.
        tool: String,
        /// Exit code, `None` when terminated by a signal.
        code: Option<i32>,
        /// Captured standard error, trimmed.
        stderr: String,
    },
}

#[allow(clippy::ref_option)] // thiserror hands format arguments over by reference
fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Errors that stop a patch run.
///
/// Everything not represented here (extraction failures, deletion failures,
/// incomplete migrations, undetectable versions) is logged and the run
/// continues.
#[derive(Error, Debug)]
pub enum PatchError {
    /// None of the supported game folders exists in the working directory.
    #[error(
        "No supported game folder found in {}. Expected one of: {}",
        .work_dir.display(),
        .expected.join(", ")
    )]
    GameFolderMissing {
        /// Directory that was searched.
        work_dir: PathBuf,
        /// Candidate folder names that were tried.
        expected: Vec<String>,
    },

    /// A required external tool is missing.
    #[error("{tool} is missing")]
    ToolMissing {
        /// Program name or path that could not be resolved.
        tool: String,
    },

    /// The binary-diff tool failed on a target; the file may be corrupted.
    #[error("Failed to apply diff to {}: {source}", .target.display())]
    DiffApply {
        /// File that was being patched in place.
        target: PathBuf,
        /// Tool failure.
        #[source]
        source: ToolError,
    },

    /// IO error outside of the best-effort paths.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl PatchError {
    /// Whether this error was raised during setup, before any mutation.
    pub fn is_setup(&self) -> bool {
        matches!(self, Self::GameFolderMissing { .. } | Self::ToolMissing { .. })
    }
}
