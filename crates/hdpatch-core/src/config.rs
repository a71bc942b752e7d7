//! Run configuration.

use std::path::PathBuf;

use crate::tools::{DEFAULT_ARCHIVER, DEFAULT_DIFF_TOOL};

/// Game folders recognised in a working directory, in detection order.
pub const GAME_FOLDERS: [&str; 4] = [
    "GenshinImpact_Data",
    "StarRail_Data",
    "ZenlessZoneZero_Data",
    "Client",
];

/// Settings for one patch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatcherConfig {
    /// Directory holding the archives and the game folder.
    pub work_dir: PathBuf,
    /// Use this game folder instead of detecting one.
    pub game_folder: Option<String>,
    /// Folder names tried when `game_folder` is unset.
    pub game_folder_candidates: Vec<String>,
    /// Archiver program (path or name on `PATH`).
    pub archiver: PathBuf,
    /// Binary-diff program (path or name on `PATH`).
    pub diff_tool: PathBuf,
    /// Remove transient artifacts and caches after a successful patch.
    pub cleanup: bool,
}

impl Default for PatcherConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            game_folder: None,
            game_folder_candidates: GAME_FOLDERS.iter().map(ToString::to_string).collect(),
            archiver: PathBuf::from(DEFAULT_ARCHIVER),
            diff_tool: PathBuf::from(DEFAULT_DIFF_TOOL),
            cleanup: true,
        }
    }
}

impl PatcherConfig {
    /// Default configuration rooted at `work_dir`.
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            ..Self::default()
        }
    }

    /// Folder names to try, honouring an explicit override.
    pub fn candidates(&self) -> Vec<String> {
        match &self.game_folder {
            Some(folder) => vec![folder.clone()],
            None => self.game_folder_candidates.clone(),
        }
    }
}
