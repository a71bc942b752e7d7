//! Well-known locations inside a working tree.
//!
//! ```text
//! <work_dir>/
//! ├── *.zip, *.7z.001, ...      # update archives
//! ├── deletefiles.txt           # delete manifest (extracted)
//! ├── hdifffiles.txt            # diff manifest (extracted)
//! ├── config.ini                # installed-version record
//! └── <game>/                   # e.g. StarRail_Data
//!     ├── version_info
//!     └── StreamingAssets/
//!         ├── asb_settings.json
//!         ├── BinaryVersion.bytes
//!         ├── Audio/GeneratedSoundBanks/Windows/   # pre-3.6 audio layout
//!         └── AudioAssets/                         # 3.6+ audio layout
//! ```

use std::path::{Path, PathBuf};

/// Name of the delete manifest.
pub const DELETE_MANIFEST: &str = "deletefiles.txt";

/// Name of the diff manifest.
pub const DIFF_MANIFEST: &str = "hdifffiles.txt";

/// Name of the persisted installed-version record.
pub const INSTALL_CONFIG: &str = "config.ini";

/// Extension appended to a target path to locate its diff artifact.
pub const DIFF_EXTENSION: &str = "hdiff";

/// The working directory and the game folder inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkTree {
    work_dir: PathBuf,
    game_dir: PathBuf,
}

impl WorkTree {
    /// Create a tree rooted at `work_dir` with the game folder `game_folder`
    /// (relative to `work_dir`).
    pub fn new(work_dir: impl Into<PathBuf>, game_folder: impl AsRef<Path>) -> Self {
        let work_dir = work_dir.into();
        let game_dir = work_dir.join(game_folder);
        Self { work_dir, game_dir }
    }

    /// Root of all relative paths in manifests and archives.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// The detected game folder.
    pub fn game_dir(&self) -> &Path {
        &self.game_dir
    }

    /// `<work_dir>/deletefiles.txt`
    pub fn delete_manifest(&self) -> PathBuf {
        self.work_dir.join(DELETE_MANIFEST)
    }

    /// `<work_dir>/hdifffiles.txt`
    pub fn diff_manifest(&self) -> PathBuf {
        self.work_dir.join(DIFF_MANIFEST)
    }

    /// `<work_dir>/config.ini`
    pub fn install_config(&self) -> PathBuf {
        self.work_dir.join(INSTALL_CONFIG)
    }

    /// `<game>/StreamingAssets`
    pub fn streaming_assets(&self) -> PathBuf {
        self.game_dir.join("StreamingAssets")
    }

    /// Audio banks location used before the 3.6 layout change.
    pub fn legacy_audio_dir(&self) -> PathBuf {
        self.streaming_assets()
            .join("Audio")
            .join("GeneratedSoundBanks")
            .join("Windows")
    }

    /// Audio banks location from 3.6 onwards.
    pub fn audio_assets_dir(&self) -> PathBuf {
        self.streaming_assets().join("AudioAssets")
    }

    /// JSON settings file carrying a free-text `variance` field.
    pub fn asb_settings(&self) -> PathBuf {
        self.streaming_assets().join("asb_settings.json")
    }

    /// Binary version marker, scanned as text.
    pub fn binary_version(&self) -> PathBuf {
        self.streaming_assets().join("BinaryVersion.bytes")
    }

    /// Plain-text version marker.
    pub fn version_info(&self) -> PathBuf {
        self.game_dir.join("version_info")
    }
}

/// Path of the diff artifact for `target`: `<target>.hdiff`.
pub fn diff_artifact_for(target: &Path) -> PathBuf {
    let mut name = target.as_os_str().to_os_string();
    name.push(".");
    name.push(DIFF_EXTENSION);
    PathBuf::from(name)
}
