//! Version extraction from filenames and installed game state.
//!
//! Versions in this domain are fuzzy: `2.3`, `3.6.0`, a `variance` string in
//! a JSON settings file, or a version buried in a binary marker file. Every
//! input is reduced to the first `major.minor[.patch]` match and normalized
//! to three components.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::paths::WorkTree;

static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+\.\d+(?:\.\d+)?)").expect("version pattern is valid")
});

static TRANSITION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"_(\d+\.\d+(?:\.\d+)?)_(\d+\.\d+(?:\.\d+)?)").expect("transition pattern is valid")
});

static ARCHIVE_SUFFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\.part\d+\.rar|\.(?:7z|zip|rar)(?:\.\d+)?)$")
        .expect("archive suffix pattern is valid")
});

/// A `major.minor.patch` game version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version {
    /// Major component.
    pub major: u32,
    /// Minor component.
    pub minor: u32,
    /// Patch component (`0` when the source only had two components).
    pub patch: u32,
}

impl Version {
    /// Build a version from its components.
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// The `(major, minor)` pair used for migration decisions.
    pub const fn feature_level(&self) -> (u32, u32) {
        (self.major, self.minor)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Error returned when a string is not a `major.minor[.patch]` version.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid version: {0:?}")]
pub struct ParseVersionError(String);

impl FromStr for Version {
    type Err = ParseVersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseVersionError(s.to_string());
        let parts: Vec<u32> = s
            .trim()
            .split('.')
            .map(str::parse)
            .collect::<Result<_, _>>()
            .map_err(|_| invalid())?;

        match parts.as_slice() {
            [major, minor] => Ok(Self::new(*major, *minor, 0)),
            [major, minor, patch] => Ok(Self::new(*major, *minor, *patch)),
            _ => Err(invalid()),
        }
    }
}

/// Append `.0` to a two-component version string; anything else is returned
/// unchanged.
///
/// ```
/// use hdpatch_core::version::normalize_version;
///
/// assert_eq!(normalize_version("3.6"), "3.6.0");
/// assert_eq!(normalize_version("3.6.1"), "3.6.1");
/// ```
pub fn normalize_version(v: &str) -> String {
    if v.split('.').count() == 2 {
        format!("{v}.0")
    } else {
        v.to_string()
    }
}

/// Locate the first version-shaped substring in `text`.
pub fn find_version(text: &str) -> Option<Version> {
    VERSION_RE
        .captures_iter(text)
        .find_map(|caps| caps[1].parse().ok())
}

/// Source and destination versions encoded in an archive name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionTransition {
    /// Version the archive upgrades from.
    pub from: Version,
    /// Version the archive upgrades to.
    pub to: Version,
}

impl VersionTransition {
    /// Parse `<anything>_<from>_<to><anything>` from an archive filename,
    /// e.g. `game_3.5.0_3.6.0_hdiff.zip`.
    ///
    /// The archive extension (and any part suffix) is dropped first so that
    /// `game_2.3_2.4.7z` reads as `2.3 -> 2.4`.
    ///
    /// Returns `None` when the name does not carry a parseable pair.
    pub fn from_archive_name(name: &str) -> Option<Self> {
        let stem = ARCHIVE_SUFFIX_RE.replace(name, "");
        let caps = TRANSITION_RE.captures(&stem)?;
        Some(Self {
            from: caps[1].parse().ok()?,
            to: caps[2].parse().ok()?,
        })
    }
}

impl fmt::Display for VersionTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from, self.to)
    }
}

/// How a state file's bytes are turned into a version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    /// JSON object; the version is searched in its `variance` string.
    JsonVariance,
    /// Arbitrary bytes, scanned as lossy UTF-8 text.
    LossyText,
}

impl Extractor {
    /// Apply this extractor to raw file contents.
    pub fn extract(self, bytes: &[u8]) -> Option<Version> {
        match self {
            Self::JsonVariance => {
                #[derive(Deserialize)]
                struct Settings {
                    #[serde(default)]
                    variance: String,
                }
                let settings: Settings = serde_json::from_slice(bytes).ok()?;
                find_version(&settings.variance)
            }
            Self::LossyText => find_version(&String::from_utf8_lossy(bytes)),
        }
    }
}

/// One installed-state file paired with the extractor that reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionProbe {
    /// Location of the state file.
    pub path: PathBuf,
    /// How to read a version out of it.
    pub extractor: Extractor,
}

/// The installed-state probes for a tree, in priority order.
pub fn installed_state_probes(tree: &WorkTree) -> Vec<VersionProbe> {
    vec![
        VersionProbe {
            path: tree.asb_settings(),
            extractor: Extractor::JsonVariance,
        },
        VersionProbe {
            path: tree.binary_version(),
            extractor: Extractor::LossyText,
        },
        VersionProbe {
            path: tree.version_info(),
            extractor: Extractor::LossyText,
        },
    ]
}

/// Try each probe in order; the first one whose source is readable and
/// yields a version wins.
///
/// `read` abstracts the filesystem so the priority logic can be exercised
/// on its own.
pub fn detect_with<F>(probes: &[VersionProbe], mut read: F) -> Option<Version>
where
    F: FnMut(&Path) -> Option<Vec<u8>>,
{
    probes.iter().find_map(|probe| {
        let bytes = read(&probe.path)?;
        let found = probe.extractor.extract(&bytes);
        tracing::debug!(
            "Version probe {}: {}",
            probe.path.display(),
            found.map_or_else(|| "no match".to_string(), |v| v.to_string())
        );
        found
    })
}

/// Recover the installed game version from the state files under `tree`.
///
/// Not finding one is an expected outcome and only logged as a warning.
pub fn detect_installed_version(tree: &WorkTree) -> Option<Version> {
    let found = detect_with(&installed_state_probes(tree), |path| fs::read(path).ok());
    if found.is_none() {
        tracing::warn!("Game version could not be detected after patch.");
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_normalize_two_components() {
        for v in ["1.0", "3.6", "10.25"] {
            assert_eq!(normalize_version(v), format!("{v}.0"));
        }
        assert_eq!(normalize_version("2.7.1"), "2.7.1");
    }

    #[test]
    fn test_parse_normalizes() {
        assert_eq!("3.6".parse::<Version>().unwrap(), Version::new(3, 6, 0));
        assert_eq!("3.6.2".parse::<Version>().unwrap(), Version::new(3, 6, 2));
        assert_eq!(Version::new(3, 6, 0).to_string(), "3.6.0");
        assert!("3".parse::<Version>().is_err());
        assert!("3.x".parse::<Version>().is_err());
        assert!("1.2.3.4".parse::<Version>().is_err());
    }

    #[test]
    fn test_find_version_first_match() {
        assert_eq!(
            find_version("OSRELWin3.5.0_R123_S456"),
            Some(Version::new(3, 5, 0))
        );
        assert_eq!(find_version("build 2.4 then 9.9"), Some(Version::new(2, 4, 0)));
        assert_eq!(find_version("no version here"), None);
    }

    #[test]
    fn test_transition_from_archive_name() {
        let t = VersionTransition::from_archive_name("StarRail_3.5.0_3.6.0_hdiff.zip").unwrap();
        assert_eq!(t.from, Version::new(3, 5, 0));
        assert_eq!(t.to, Version::new(3, 6, 0));

        let short = VersionTransition::from_archive_name("game_2.3_2.4.7z").unwrap();
        assert_eq!(short.from, Version::new(2, 3, 0));
        assert_eq!(short.to, Version::new(2, 4, 0));

        for name in ["game_2.3_2.4.7z.001", "game_2.3_2.4.part1.rar", "GAME_2.3_2.4.7Z"] {
            let t = VersionTransition::from_archive_name(name).unwrap();
            assert_eq!(t.to, Version::new(2, 4, 0), "{name}");
        }
        let full = VersionTransition::from_archive_name("game_3.5.1_3.6.2.7z").unwrap();
        assert_eq!(full.to, Version::new(3, 6, 2));

        assert!(VersionTransition::from_archive_name("update.zip").is_none());
        assert!(VersionTransition::from_archive_name("game-3.5-3.6.zip").is_none());
    }

    #[test]
    fn test_extractors() {
        let json = br#"{"variance": "OSRELWin3.6.0_R1", "other": 1}"#;
        assert_eq!(
            Extractor::JsonVariance.extract(json),
            Some(Version::new(3, 6, 0))
        );
        assert_eq!(Extractor::JsonVariance.extract(b"not json 3.6.0"), None);
        assert_eq!(Extractor::JsonVariance.extract(br#"{"x": "3.6"}"#), None);

        let binary = b"\x00\x01\xffOSRELWin2.8\x00";
        assert_eq!(
            Extractor::LossyText.extract(binary),
            Some(Version::new(2, 8, 0))
        );
    }

    #[test]
    fn test_detect_with_priority_and_fallthrough() {
        let probes = vec![
            VersionProbe {
                path: PathBuf::from("a.json"),
                extractor: Extractor::JsonVariance,
            },
            VersionProbe {
                path: PathBuf::from("b.bytes"),
                extractor: Extractor::LossyText,
            },
            VersionProbe {
                path: PathBuf::from("c"),
                extractor: Extractor::LossyText,
            },
        ];

        // Present but unparseable sources fall through to the next probe.
        let mut files: HashMap<PathBuf, Vec<u8>> = HashMap::new();
        files.insert(PathBuf::from("a.json"), br#"{"variance": ""}"#.to_vec());
        files.insert(PathBuf::from("b.bytes"), b"v3.7.1".to_vec());
        files.insert(PathBuf::from("c"), b"1.0".to_vec());
        let found = detect_with(&probes, |p| files.get(p).cloned());
        assert_eq!(found, Some(Version::new(3, 7, 1)));

        files.insert(PathBuf::from("a.json"), br#"{"variance": "4.0"}"#.to_vec());
        let found = detect_with(&probes, |p| files.get(p).cloned());
        assert_eq!(found, Some(Version::new(4, 0, 0)));

        assert_eq!(detect_with(&probes, |_| None), None);
    }

    #[test]
    fn test_detect_installed_version_from_disk() {
        let dir = tempdir().unwrap();
        let tree = WorkTree::new(dir.path(), "StarRail_Data");
        assert_eq!(detect_installed_version(&tree), None);

        fs::create_dir_all(tree.game_dir()).unwrap();
        fs::write(tree.version_info(), "3.6").unwrap();
        assert_eq!(detect_installed_version(&tree), Some(Version::new(3, 6, 0)));

        fs::create_dir_all(tree.streaming_assets()).unwrap();
        fs::write(tree.binary_version(), b"\x07\x00OSRELWin3.6.1\x00").unwrap();
        assert_eq!(detect_installed_version(&tree), Some(Version::new(3, 6, 1)));
    }
}
