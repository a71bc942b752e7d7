//! Top-level run: setup checks, every archive through the engine, cleanup.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::archive::{ArchiveResolver, LogicalArchive};
use crate::cleanup::{CleanupManager, CleanupReport};
use crate::config::PatcherConfig;
use crate::engine::{ArchiveReport, PatchEngine};
use crate::error::PatchError;
use crate::migration::MigrationPolicy;
use crate::paths::WorkTree;
use crate::tools::{Archiver, DiffTool, HPatchz, SevenZip};
use crate::version::{self, Version};

/// Find the first existing game folder among `candidates` in `work_dir`.
///
/// # Errors
///
/// Returns [`PatchError::GameFolderMissing`] if none exists.
pub fn detect_game_folder(work_dir: &Path, candidates: &[String]) -> Result<WorkTree, PatchError> {
    let found = candidates
        .iter()
        .find(|folder| work_dir.join(folder).is_dir())
        .ok_or_else(|| PatchError::GameFolderMissing {
            work_dir: work_dir.to_path_buf(),
            expected: candidates.to_vec(),
        })?;

    tracing::info!("Detected game folder: {found}");
    Ok(WorkTree::new(work_dir, found))
}

/// Result of a complete run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// One entry per logical archive, in processing order.
    pub archives: Vec<ArchiveReport>,
    /// Whether any diff was applied during the run.
    pub patched: bool,
    /// Version detected after patching (only looked up when patched).
    pub installed_version: Option<Version>,
    /// What the cleanup pass removed.
    pub cleanup: CleanupReport,
}

/// Patches one working tree with a given archiver and diff tool.
#[derive(Debug)]
pub struct Patcher<A, D> {
    tree: WorkTree,
    archiver: A,
    diff_tool: D,
    policy: MigrationPolicy,
    cleanup: bool,
}

impl Patcher<SevenZip, HPatchz> {
    /// Run the setup checks and build a patcher with the real tools.
    ///
    /// Nothing on disk is modified by this call.
    ///
    /// # Errors
    ///
    /// Returns a setup error ([`PatchError::is_setup`]) when the game folder
    /// or either tool is missing.
    pub fn from_config(config: &PatcherConfig) -> Result<Self, PatchError> {
        let tree = detect_game_folder(&config.work_dir, &config.candidates())?;
        let archiver = SevenZip::locate(&config.archiver, &config.work_dir)?;
        let diff_tool = HPatchz::locate(&config.diff_tool, &config.work_dir)?;
        tracing::debug!(
            "Using archiver {} and diff tool {}",
            archiver.program().display(),
            diff_tool.program().display()
        );

        Ok(Self::new(tree, archiver, diff_tool).with_cleanup(config.cleanup))
    }
}

impl<A: Archiver, D: DiffTool> Patcher<A, D> {
    /// Patcher for an already detected tree.
    pub fn new(tree: WorkTree, archiver: A, diff_tool: D) -> Self {
        Self {
            tree,
            archiver,
            diff_tool,
            policy: MigrationPolicy::default(),
            cleanup: true,
        }
    }

    /// Enable or disable artifact and cache removal.
    pub fn with_cleanup(mut self, cleanup: bool) -> Self {
        self.cleanup = cleanup;
        self
    }

    /// The tree being patched.
    pub fn tree(&self) -> &WorkTree {
        &self.tree
    }

    /// Process every archive in the working directory, then clean up.
    ///
    /// Multi-part groups run first, then single archives, including any
    /// that the groups extracted. An archive file is processed at most once
    /// per run even if it could not be deleted. The installed
    /// version is detected and recorded, and artifacts removed, only if at
    /// least one diff was applied. Empty directories are removed on every
    /// run.
    ///
    /// # Errors
    ///
    /// Stops at the first [`PatchError::DiffApply`], or if the working
    /// directory cannot be listed.
    pub fn run(&self) -> Result<RunSummary, PatchError> {
        let mut summary = RunSummary::default();
        let engine = PatchEngine::new(&self.tree, &self.archiver, &self.diff_tool, self.policy);

        let resolver = ArchiveResolver::new(self.tree.work_dir());
        let mut seen: HashSet<PathBuf> = HashSet::new();
        loop {
            let mut pending: Vec<LogicalArchive> = resolver
                .discover()?
                .into_iter()
                .filter(|a| !seen.contains(a.entry()))
                .collect();
            if pending.is_empty() {
                break;
            }
            // Groups can carry single archives; rescan before taking singles.
            if pending.iter().any(LogicalArchive::is_multipart) {
                pending.retain(LogicalArchive::is_multipart);
            }

            for archive in pending {
                seen.insert(archive.entry().to_path_buf());
                let report = engine.process(&archive)?;
                summary.patched |= report.patched;
                summary.archives.push(report);
            }
        }

        let cleanup = CleanupManager::new(&self.tree);
        if summary.patched {
            summary.installed_version = version::detect_installed_version(&self.tree);
            summary.cleanup = cleanup.run(summary.installed_version, self.cleanup);
        } else {
            summary.cleanup.empty_dirs = cleanup.remove_empty_dirs();
        }

        tracing::info!("Patching finished.");
        Ok(summary)
    }
}
