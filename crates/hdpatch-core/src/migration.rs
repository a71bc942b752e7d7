//! Version-gated audio layout migration.
//!
//! From 3.6 the audio banks live in `StreamingAssets/AudioAssets` instead of
//! `StreamingAssets/Audio/GeneratedSoundBanks/Windows`. Diffs in an update
//! that crosses that boundary target the new location, so the old tree is
//! merged into the new one before any diff is applied.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::paths::WorkTree;
use crate::version::{Version, VersionTransition};

/// First version using the `AudioAssets` layout.
pub const AUDIO_LAYOUT_THRESHOLD: Version = Version::new(3, 6, 0);

/// Decides whether a version jump needs the structural migration.
///
/// Only `(major, minor)` is compared; the patch component never matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationPolicy {
    threshold: Version,
}

impl Default for MigrationPolicy {
    fn default() -> Self {
        Self::new(AUDIO_LAYOUT_THRESHOLD)
    }
}

impl MigrationPolicy {
    /// Policy with a custom threshold.
    pub const fn new(threshold: Version) -> Self {
        Self { threshold }
    }

    /// The boundary version.
    pub const fn threshold(&self) -> Version {
        self.threshold
    }

    /// Migration is required when `from` is below the threshold and `to` is
    /// at or above it.
    pub fn requires_migration(&self, transition: &VersionTransition) -> bool {
        transition.from.feature_level() < self.threshold.feature_level()
            && self.reaches_threshold(transition.to)
    }

    /// Decide from an archive name; an unparseable name never requires
    /// migration.
    pub fn requires_migration_for(&self, archive_name: &str) -> bool {
        VersionTransition::from_archive_name(archive_name)
            .is_some_and(|t| self.requires_migration(&t))
    }

    /// Whether `to` uses the new layout.
    pub fn reaches_threshold(&self, to: Version) -> bool {
        to.feature_level() >= self.threshold.feature_level()
    }
}

/// Result of a migration attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The destination version is below the threshold or unknown.
    NotApplicable,
    /// There is no old tree to migrate.
    NothingToMigrate,
    /// The old tree was merged into the new location.
    Completed {
        /// Files moved or copied.
        moved: usize,
        /// Entries that could neither be moved nor copied.
        failed: Vec<PathBuf>,
    },
}

impl MigrationOutcome {
    /// Whether every file reached the new location.
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Completed { failed, .. } if failed.is_empty())
    }
}

/// Merges the pre-3.6 audio tree into its 3.6+ location.
#[derive(Debug, Clone, Copy)]
pub struct AudioMigration<'a> {
    tree: &'a WorkTree,
    policy: MigrationPolicy,
}

impl<'a> AudioMigration<'a> {
    /// Migration for the game folder of `tree`.
    pub fn new(tree: &'a WorkTree, policy: MigrationPolicy) -> Self {
        Self { tree, policy }
    }

    /// Move every file from the old tree to the same relative path under the
    /// new tree, creating directories as needed, then remove the old tree.
    ///
    /// A file that cannot be renamed is moved by copy-and-delete; if that
    /// also fails it is recorded in the outcome and the rest continue.
    pub fn run(&self, to: Option<Version>) -> MigrationOutcome {
        if !to.is_some_and(|v| self.policy.reaches_threshold(v)) {
            return MigrationOutcome::NotApplicable;
        }

        let old = self.tree.legacy_audio_dir();
        let new = self.tree.audio_assets_dir();
        if !old.is_dir() {
            return MigrationOutcome::NothingToMigrate;
        }

        if let Err(e) = fs::create_dir_all(&new) {
            tracing::warn!("Could not create {}: {e}", new.display());
        }

        let entries: Vec<walkdir::DirEntry> = walkdir::WalkDir::new(&old)
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .collect();

        let mut moved = 0;
        let mut failed = Vec::new();
        for entry in entries {
            let Ok(rel) = entry.path().strip_prefix(&old) else {
                continue;
            };
            let dest = new.join(rel);

            let result = if entry.file_type().is_dir() {
                fs::create_dir_all(&dest).or_else(|_| copy_tree(entry.path(), &dest))
            } else {
                move_file(entry.path(), &dest).map(|()| moved += 1)
            };
            if let Err(e) = result {
                tracing::warn!("Failed to migrate {}: {e}", rel.display());
                failed.push(rel.to_path_buf());
            }
        }

        if let Err(e) = fs::remove_dir_all(&old) {
            tracing::warn!("Could not remove {}: {e}", old.display());
        }
        tracing::info!("Audio migration completed.");
        MigrationOutcome::Completed { moved, failed }
    }
}

fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)?;
    }
    if fs::rename(src, dest).is_ok() {
        return Ok(());
    }

    let options = fs_extra::file::CopyOptions::new().overwrite(true);
    fs_extra::file::move_file(src, dest, &options)
        .map(|_| ())
        .map_err(|e| io::Error::other(e.to_string()))
}

fn copy_tree(src: &Path, dest: &Path) -> io::Result<()> {
    let options = fs_extra::dir::CopyOptions::new()
        .overwrite(true)
        .content_only(true);
    fs::create_dir_all(dest)?;
    fs_extra::dir::copy(src, dest, &options)
        .map(|_| ())
        .map_err(|e| io::Error::other(e.to_string()))
}
