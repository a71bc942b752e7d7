//! External collaborators: the archiver and the binary-diff tool.
//!
//! Both are blocking child processes with fixed command lines:
//!
//! - archiver: `<archiver> x <archive> -o<destdir> -y`
//! - diff tool: `<diff-tool> -f <original> <diff> <original>` (patch in place)
//!
//! The traits exist so the pipeline can be driven by in-process fakes.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{PatchError, ToolError};

/// Extracts an archive (single file or the first part of a multi-volume set).
pub trait Archiver {
    /// Extract `archive` into `dest`, overwriting existing files.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] when the archiver cannot be started or exits
    /// unsuccessfully.
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ToolError>;
}

/// Applies a binary diff to a file in place.
pub trait DiffTool {
    /// Patch `original` with `diff`, writing the result back to `original`.
    ///
    /// # Errors
    ///
    /// Returns a [`ToolError`] when the tool cannot be started or exits
    /// unsuccessfully; `original` may then be corrupted.
    fn apply(&self, original: &Path, diff: &Path) -> Result<(), ToolError>;
}

impl<T: Archiver + ?Sized> Archiver for &T {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ToolError> {
        (**self).extract(archive, dest)
    }
}

impl<T: DiffTool + ?Sized> DiffTool for &T {
    fn apply(&self, original: &Path, diff: &Path) -> Result<(), ToolError> {
        (**self).apply(original, diff)
    }
}

/// Default archiver program name for this platform.
pub const DEFAULT_ARCHIVER: &str = if cfg!(windows) { "7z.exe" } else { "7z" };

/// Default binary-diff program name for this platform.
pub const DEFAULT_DIFF_TOOL: &str = if cfg!(windows) {
    "hpatchz.exe"
} else {
    "hpatchz"
};

/// Resolve a tool given as a path or a bare program name.
///
/// Checked in order: the path as given, the path relative to `work_dir`,
/// then a `PATH` lookup.
///
/// # Errors
///
/// Returns [`PatchError::ToolMissing`] if none of the lookups succeeds.
pub fn locate_tool(program: &Path, work_dir: &Path) -> Result<PathBuf, PatchError> {
    let candidates = [program.to_path_buf(), work_dir.join(program)];
    if let Some(found) = candidates.iter().find(|p| p.is_file()) {
        return Ok(std::path::absolute(found).unwrap_or_else(|_| found.clone()));
    }

    which::which(program).map_err(|_| PatchError::ToolMissing {
        tool: program.display().to_string(),
    })
}

/// Run a prepared command and map failures to [`ToolError`].
fn run(mut cmd: Command) -> Result<(), ToolError> {
    let tool = cmd.get_program().to_string_lossy().into_owned();
    tracing::debug!(
        "Running {tool} {}",
        cmd.get_args()
            .map(OsStr::to_string_lossy)
            .collect::<Vec<_>>()
            .join(" ")
    );

    let output = match cmd.output() {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ToolError::NotFound { tool });
        }
        Err(e) => return Err(ToolError::Spawn { tool, source: e }),
    };

    if !output.status.success() {
        return Err(ToolError::Failed {
            tool,
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(())
}

/// 7-Zip compatible command-line archiver.
#[derive(Debug, Clone)]
pub struct SevenZip {
    program: PathBuf,
}

impl SevenZip {
    /// Use the archiver at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Locate the archiver (see [`locate_tool`]).
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::ToolMissing`] if it cannot be found.
    pub fn locate(program: &Path, work_dir: &Path) -> Result<Self, PatchError> {
        locate_tool(program, work_dir).map(Self::new)
    }

    /// Resolved program path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, archive: &Path, dest: &Path) -> Command {
        let mut out_flag = std::ffi::OsString::from("-o");
        out_flag.push(dest);

        let mut cmd = Command::new(&self.program);
        cmd.arg("x").arg(archive).arg(out_flag).arg("-y");
        cmd
    }
}

impl Archiver for SevenZip {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ToolError> {
        run(self.command(archive, dest))
    }
}

/// `hpatchz` from HDiffPatch.
#[derive(Debug, Clone)]
pub struct HPatchz {
    program: PathBuf,
}

impl HPatchz {
    /// Use the patcher at `program`.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Locate the patcher (see [`locate_tool`]).
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::ToolMissing`] if it cannot be found.
    pub fn locate(program: &Path, work_dir: &Path) -> Result<Self, PatchError> {
        locate_tool(program, work_dir).map(Self::new)
    }

    /// Resolved program path.
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn command(&self, original: &Path, diff: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg("-f").arg(original).arg(diff).arg(original);
        cmd
    }
}

impl DiffTool for HPatchz {
    fn apply(&self, original: &Path, diff: &Path) -> Result<(), ToolError> {
        run(self.command(original, diff))
    }
}
