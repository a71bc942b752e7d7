//! Delete and diff manifests.
//!
//! Both manifests are newline-delimited lists of paths relative to the
//! working directory. Lines may be wrapped as `{"remoteName": "<path>"}` and
//! use `/` separators regardless of platform. A manifest is consumed exactly
//! once: it is deleted after its last entry is processed.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::error::PatchError;
use crate::fsutil;
use crate::paths::diff_artifact_for;
use crate::tools::DiffTool;

/// A path scheduled for removal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteEntry {
    /// Target, relative to the working directory.
    pub target: PathBuf,
}

/// A file to patch and the diff artifact that patches it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffEntry {
    /// Target, relative to the working directory.
    pub target: PathBuf,
    /// `<target>.hdiff`, relative to the working directory.
    pub diff: PathBuf,
}

impl DiffEntry {
    /// Entry for `target` with its co-located diff artifact.
    pub fn for_target(target: PathBuf) -> Self {
        let diff = diff_artifact_for(&target);
        Self { target, diff }
    }
}

#[derive(Deserialize)]
struct RemoteEntry {
    #[serde(rename = "remoteName")]
    remote_name: String,
}

/// Turn one manifest line into a platform-native relative path.
///
/// Returns `None` for blank lines, bracket-only lines, and entries that would
/// escape the working directory (absolute paths, `..`).
pub fn parse_entry(line: &str) -> Option<PathBuf> {
    let line = line.trim().trim_end_matches(',').trim();
    if line.is_empty() || line == "[" || line == "]" {
        return None;
    }

    let raw = if line.starts_with('{') {
        match serde_json::from_str::<RemoteEntry>(line) {
            Ok(entry) => entry.remote_name,
            Err(_) => line
                .replace("{\"remoteName\": \"", "")
                .replace("\"}", ""),
        }
    } else {
        line.to_string()
    };

    let mut path = PathBuf::new();
    for segment in raw.split(['/', '\\']).filter(|s| !s.is_empty() && *s != ".") {
        path.push(segment);
    }

    let confined = !raw.starts_with(['/', '\\'])
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if path.as_os_str().is_empty() || !confined {
        if !path.as_os_str().is_empty() {
            tracing::warn!("Ignoring manifest entry outside the working tree: {raw}");
        }
        return None;
    }

    Some(path)
}

/// Read every entry of a manifest; a missing manifest yields `None`.
fn read_entries(manifest: &Path) -> Option<Vec<PathBuf>> {
    let bytes = fs::read(manifest).ok()?;
    let text = String::from_utf8_lossy(&bytes);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);
    Some(text.lines().filter_map(parse_entry).collect())
}

/// Outcome of a delete-manifest pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DeleteReport {
    /// Entries that were removed.
    pub removed: Vec<PathBuf>,
    /// Entries that did not exist.
    pub missing: Vec<PathBuf>,
    /// Entries whose removal failed.
    pub failed: Vec<PathBuf>,
}

/// Applies the delete and diff manifests found in a working directory.
#[derive(Debug, Clone, Copy)]
pub struct ManifestProcessor<'a> {
    root: &'a Path,
}

impl<'a> ManifestProcessor<'a> {
    /// Processor resolving entries against `root`.
    pub fn new(root: &'a Path) -> Self {
        Self { root }
    }

    /// Remove every path listed in `manifest`, then the manifest itself.
    ///
    /// Each removal is best-effort: missing targets are skipped silently and
    /// failures are logged without stopping the remaining entries.
    pub fn process_deletes(&self, manifest: &Path) -> DeleteReport {
        let mut report = DeleteReport::default();
        let Some(entries) = read_entries(manifest) else {
            return report;
        };

        for entry in entries.into_iter().map(|target| DeleteEntry { target }) {
            let target = self.root.join(&entry.target);
            if fs::symlink_metadata(&target).is_err() {
                report.missing.push(entry.target);
                continue;
            }

            fsutil::make_writable_recursive(&target);
            let is_dir = target.is_dir();
            match fsutil::remove_path(&target) {
                Ok(()) if is_dir => {
                    tracing::info!("Deleted directory tree: {}", entry.target.display());
                    report.removed.push(entry.target);
                }
                Ok(()) => {
                    tracing::info!("Deleted file: {}", entry.target.display());
                    report.removed.push(entry.target);
                }
                Err(e) => {
                    tracing::warn!("Failed to delete {}: {e}", entry.target.display());
                    report.failed.push(entry.target);
                }
            }
        }

        fsutil::remove_file_quietly(manifest);
        report
    }

    /// Apply every diff listed in `manifest` with `tool`, then delete the
    /// manifest.
    ///
    /// Entries without a `.hdiff` artifact are skipped. Returns whether at
    /// least one diff was applied.
    ///
    /// # Errors
    ///
    /// Returns [`PatchError::DiffApply`] on the first tool failure. The
    /// manifest is then left in place so a later run resumes with the
    /// entries whose artifacts remain.
    pub fn apply_diffs<D: DiffTool + ?Sized>(
        &self,
        manifest: &Path,
        tool: &D,
    ) -> Result<bool, PatchError> {
        let Some(entries) = read_entries(manifest) else {
            return Ok(false);
        };

        let mut patched = false;
        for entry in entries.into_iter().map(DiffEntry::for_target) {
            let original = self.root.join(&entry.target);
            let diff = self.root.join(&entry.diff);
            if !diff.is_file() {
                tracing::debug!("No diff artifact for {}", entry.target.display());
                continue;
            }

            if let Err(e) = fsutil::ensure_writable(&original) {
                tracing::warn!("Could not make {} writable: {e}", entry.target.display());
            }

            if let Err(source) = tool.apply(&original, &diff) {
                tracing::error!("Diff tool failed for {}: {source}", entry.target.display());
                return Err(PatchError::DiffApply {
                    target: entry.target,
                    source,
                });
            }
            patched = true;

            fsutil::remove_file_quietly(&diff);
            tracing::info!("Patched: {}", entry.target.display());
        }

        fsutil::remove_file_quietly(manifest);
        Ok(patched)
    }
}
