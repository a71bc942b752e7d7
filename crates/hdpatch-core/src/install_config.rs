//! The `config.ini` installed-version record read by the game launcher.

use std::io;
use std::path::Path;

use ini::Ini;

use crate::version::Version;

const SECTION: &str = "General";

/// Contents of the `[General]` section. Only `game_version` varies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
    /// `channel`
    pub channel: String,
    /// `cps`, the distribution channel id.
    pub cps: String,
    /// `game_version`
    pub game_version: Version,
    /// `sub_channel`
    pub sub_channel: String,
}

impl InstallConfig {
    /// Record for `game_version` with the fixed launcher values.
    pub fn new(game_version: Version) -> Self {
        Self {
            channel: "1".to_string(),
            cps: "hoyoverse".to_string(),
            game_version,
            sub_channel: "0".to_string(),
        }
    }

    fn to_ini(&self) -> Ini {
        let mut conf = Ini::new();
        conf.with_section(Some(SECTION))
            .set("channel", self.channel.as_str())
            .set("cps", self.cps.as_str())
            .set("game_version", self.game_version.to_string())
            .set("sub_channel", self.sub_channel.as_str());
        conf
    }

    /// Write the record to `path`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, path: &Path) -> io::Result<()> {
        self.to_ini().write_to_file(path)
    }

    /// Read `game_version` back from an existing record.
    pub fn read_version(path: &Path) -> Option<Version> {
        let conf = Ini::load_from_file(path).ok()?;
        conf.get_from(Some(SECTION), "game_version")?.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_general_section() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.ini");
        InstallConfig::new(Version::new(3, 6, 0)).write(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[General]",
                "channel=1",
                "cps=hoyoverse",
                "game_version=3.6.0",
                "sub_channel=0",
            ]
        );
        assert_eq!(
            InstallConfig::read_version(&path),
            Some(Version::new(3, 6, 0))
        );
    }

    #[test]
    fn test_write_replaces_previous_record() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.ini");
        InstallConfig::new(Version::new(3, 5, 0)).write(&path).unwrap();
        InstallConfig::new(Version::new(3, 6, 2)).write(&path).unwrap();
        assert_eq!(
            InstallConfig::read_version(&path),
            Some(Version::new(3, 6, 2))
        );
    }

    #[test]
    fn test_read_version_missing_file() {
        let dir = tempdir().unwrap();
        assert_eq!(InstallConfig::read_version(&dir.path().join("config.ini")), None);
    }
}
