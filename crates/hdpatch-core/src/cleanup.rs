//! Post-patch cleanup: installed-version record, transient artifacts,
//! caches, and empty directories.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::fsutil;
use crate::install_config::InstallConfig;
use crate::paths::WorkTree;
use crate::version::Version;

/// File-name globs of transient artifacts, matched anywhere under the
/// working directory.
pub const TRANSIENT_PATTERNS: &[&str] = &[
    "*.py",
    "*.bat",
    "*.zip",
    "*.zip.*",
    "*.rar",
    "*.rar.*",
    "*.part*.rar",
    "*.7z",
    "*.7z.*",
    "hpatchz",
    "hpatchz.exe",
    "hdiffz",
    "hdiffz.exe",
    "7z",
    "7z.exe",
    "version.dll",
    "*.dmp",
    "*.bak",
    "*.txt",
    "*.log",
];

/// Cache and log directory names, matched anywhere under the game folder.
pub const CACHE_DIRS: &[&str] = &[
    "SDKCaches",
    "webCaches",
    "kr_game_cache",
    "launcherDownload",
    ".quality",
    "quality",
    "CrashSightLog",
    "pipe_client",
    "TQM64",
    "wesight",
];

/// What a cleanup pass removed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Transient files removed.
    pub files: Vec<PathBuf>,
    /// Cache directories removed.
    pub cache_dirs: Vec<PathBuf>,
    /// Empty directories removed.
    pub empty_dirs: usize,
}

/// Restores a working tree to a clean state after patching.
#[derive(Debug)]
pub struct CleanupManager<'a> {
    tree: &'a WorkTree,
    patterns: Vec<Pattern>,
}

impl<'a> CleanupManager<'a> {
    /// Manager for `tree` with the default artifact patterns.
    pub fn new(tree: &'a WorkTree) -> Self {
        let patterns = TRANSIENT_PATTERNS
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .collect();
        Self { tree, patterns }
    }

    /// Persist the installed version into `config.ini`.
    ///
    /// Without a version nothing is written.
    pub fn write_install_record(&self, version: Option<Version>) -> Option<PathBuf> {
        let version = version?;
        let path = self.tree.install_config();
        match InstallConfig::new(version).write(&path) {
            Ok(()) => {
                tracing::info!("Wrote game_version={version} to {}", path.display());
                Some(path)
            }
            Err(e) => {
                tracing::warn!("Failed to write {}: {e}", path.display());
                None
            }
        }
    }

    fn is_transient(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(name))
    }

    /// Remove tool binaries, leftover archives and parts, scripts, logs and
    /// crash dumps anywhere under the working directory.
    pub fn remove_transient_files(&self) -> Vec<PathBuf> {
        let targets: Vec<PathBuf> = walkdir::WalkDir::new(self.tree.work_dir())
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| !e.file_type().is_dir())
            .filter(|e| e.file_name().to_str().is_some_and(|n| self.is_transient(n)))
            .map(walkdir::DirEntry::into_path)
            .collect();

        let mut removed = Vec::new();
        for path in targets {
            let _ = fsutil::ensure_writable(&path);
            if fsutil::remove_file_quietly(&path) {
                tracing::debug!("Removed {}", path.display());
                removed.push(path);
            }
        }
        removed
    }

    /// Remove the known cache and log directories anywhere under the game
    /// folder.
    pub fn remove_cache_dirs(&self) -> Vec<PathBuf> {
        let found: Vec<PathBuf> = walkdir::WalkDir::new(self.tree.game_dir())
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_dir())
            .filter(|e| {
                e.file_name()
                    .to_str()
                    .is_some_and(|n| CACHE_DIRS.contains(&n))
            })
            .map(walkdir::DirEntry::into_path)
            .collect();

        let mut removed = Vec::new();
        for dir in found {
            // Nested matches disappear with their ancestor.
            if !dir.exists() {
                continue;
            }
            fsutil::make_writable_recursive(&dir);
            match fs::remove_dir_all(&dir) {
                Ok(()) => {
                    tracing::info!("Deleted directory tree (flex): {}", dir.display());
                    removed.push(dir);
                }
                Err(e) => tracing::warn!("Failed to delete {}: {e}", dir.display()),
            }
        }
        removed
    }

    /// Remove every directory under the game folder that is, or becomes,
    /// empty. The game folder itself is kept.
    ///
    /// Passes run deepest-first until one removes nothing.
    pub fn remove_empty_dirs(&self) -> usize {
        remove_empty_dirs_under(self.tree.game_dir())
    }

    /// Full post-patch cleanup: record, artifacts, caches, empty directories.
    pub fn run(&self, version: Option<Version>, remove_artifacts: bool) -> CleanupReport {
        self.write_install_record(version);
        let mut report = CleanupReport::default();
        if remove_artifacts {
            report.files = self.remove_transient_files();
            report.cache_dirs = self.remove_cache_dirs();
        }
        report.empty_dirs = self.remove_empty_dirs();
        report
    }
}

/// Fixed-point removal of empty directories strictly below `root`.
pub fn remove_empty_dirs_under(root: &Path) -> usize {
    let mut total = 0;
    loop {
        let dirs: BTreeSet<PathBuf> = walkdir::WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_dir())
            .map(walkdir::DirEntry::into_path)
            .collect();

        // Reverse lexical order visits children before their parents.
        let removed = dirs
            .iter()
            .rev()
            .filter(|dir| fs::remove_dir(dir).is_ok())
            .count();
        if removed == 0 {
            return total;
        }
        total += removed;
    }
}
