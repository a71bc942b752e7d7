//! Archive discovery and multi-part grouping.
//!
//! Files in the working directory are classified by name (case-insensitive):
//!
//! 1. `*.{7z,zip,rar}.0*1` and `*.part0*1.rar` start a multi-part group.
//! 2. `*.{7z,zip,rar}.0*N` and `*.partN.rar` are later parts; they are never
//!    extracted on their own.
//! 3. Any other `*.zip`, `*.7z` or `*.rar` is a single-part archive.
//!
//! Parts of a group are ordered by their numeric index, so `.010` sorts after
//! `.009` and `.part10.rar` after `.part9.rar`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;

use crate::fsutil;
use crate::tools::Archiver;

static NUMBERED_PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*\.(?:7z|zip|rar))\.(\d+)$").expect("numbered part pattern is valid")
});

static RAR_PART_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)\.part(\d+)\.rar$").expect("rar part pattern is valid"));

const ARCHIVE_EXTENSIONS: [&str; 3] = [".zip", ".7z", ".rar"];

/// How a single file name relates to a logical archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveKind {
    /// First volume of a multi-part set.
    FirstPart(PartName),
    /// Any later volume of a multi-part set.
    OtherPart(PartName),
    /// A self-contained archive.
    Single,
}

/// Decomposed multi-part file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartName {
    /// Shared basename, lowercased (`update.zip` or `update` for `.partN.rar`).
    pub stem: String,
    /// Numeric part index.
    pub index: u32,
    /// Naming convention of the set.
    pub style: PartStyle,
}

/// Multi-part naming conventions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartStyle {
    /// `name.ext.001`
    Numbered,
    /// `name.part1.rar`
    RarPart,
}

impl PartName {
    fn parse(lower: &str) -> Option<Self> {
        let (caps, style) = if let Some(caps) = NUMBERED_PART_RE.captures(lower) {
            (caps, PartStyle::Numbered)
        } else {
            (RAR_PART_RE.captures(lower)?, PartStyle::RarPart)
        };
        Some(Self {
            stem: caps[1].to_string(),
            index: caps[2].parse().ok()?,
            style,
        })
    }

    fn same_set(&self, other: &Self) -> bool {
        self.stem == other.stem && self.style == other.style
    }
}

/// Classify a file name; `None` for anything that is not an archive.
pub fn classify(name: &str) -> Option<ArchiveKind> {
    let lower = name.to_ascii_lowercase();
    if let Some(part) = PartName::parse(&lower) {
        return Some(if part.index == 1 {
            ArchiveKind::FirstPart(part)
        } else {
            ArchiveKind::OtherPart(part)
        });
    }

    ARCHIVE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(ext))
        .then_some(ArchiveKind::Single)
}

/// One conceptually whole archive backed by one or more files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalArchive {
    name: String,
    parts: Vec<PathBuf>,
    multipart: bool,
}

impl LogicalArchive {
    /// Logical filename, e.g. `game_3.5.0_3.6.0.zip` for
    /// `game_3.5.0_3.6.0.zip.001`. Version pairs are parsed from it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The file handed to the archiver (the single file or the first part).
    pub fn entry(&self) -> &Path {
        &self.parts[0]
    }

    /// Every physical file, in extraction order.
    pub fn parts(&self) -> &[PathBuf] {
        &self.parts
    }

    /// Whether this archive spans several files.
    pub fn is_multipart(&self) -> bool {
        self.multipart
    }

    /// Extract into `dest`, then delete every physical part whatever the
    /// outcome, so a retried run cannot process this archive again.
    ///
    /// Returns whether extraction succeeded. A failure is logged and leaves
    /// whatever payload the archiver produced.
    pub fn extract_and_consume<A: Archiver + ?Sized>(&self, archiver: &A, dest: &Path) -> bool {
        if self.is_multipart() {
            tracing::info!("Processing multipart archive: {}", file_name(self.entry()));
        } else {
            tracing::info!("Processing archive: {}", self.name);
        }

        let extracted = match archiver.extract(self.entry(), dest) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to extract {}: {e}", self.entry().display());
                false
            }
        };

        for part in &self.parts {
            if !fsutil::remove_file_quietly(part) {
                tracing::debug!("Could not remove archive part {}", part.display());
            }
        }
        extracted
    }
}

fn file_name(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Finds logical archives in a directory.
#[derive(Debug, Clone)]
pub struct ArchiveResolver {
    dir: PathBuf,
}

impl ArchiveResolver {
    /// Resolver scanning `dir` (non-recursive).
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_names(&self) -> io::Result<Vec<String>> {
        let mut names: Vec<String> = fs::read_dir(&self.dir)?
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_file()))
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Every logical archive: multi-part groups first (by first-part name),
    /// then single-part archives (by name).
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn discover(&self) -> io::Result<Vec<LogicalArchive>> {
        let names = self.file_names()?;
        let mut groups = Vec::new();
        let mut singles = Vec::new();

        for name in &names {
            match classify(name) {
                Some(ArchiveKind::FirstPart(first)) => {
                    groups.push(self.group(name, &first, &names));
                }
                Some(ArchiveKind::Single) => singles.push(LogicalArchive {
                    name: name.clone(),
                    parts: vec![self.dir.join(name)],
                    multipart: false,
                }),
                Some(ArchiveKind::OtherPart(_)) | None => {}
            }
        }

        groups.extend(singles);
        Ok(groups)
    }

    /// Sibling parts of the set started by `first_name`, the first included.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn collect_parts(&self, first_name: &str) -> io::Result<Vec<PathBuf>> {
        let names = self.file_names()?;
        match classify(first_name) {
            Some(ArchiveKind::FirstPart(first)) => {
                Ok(self.group(first_name, &first, &names).parts)
            }
            _ => Ok(vec![self.dir.join(first_name)]),
        }
    }

    fn group(&self, first_name: &str, first: &PartName, names: &[String]) -> LogicalArchive {
        let mut siblings: Vec<(u32, &String)> = names
            .iter()
            .filter_map(|name| {
                let part = PartName::parse(&name.to_ascii_lowercase())?;
                part.same_set(first).then_some((part.index, name))
            })
            .collect();
        siblings.sort();

        let name = match first.style {
            // `update.zip.001` -> `update.zip`, keeping the original case.
            PartStyle::Numbered => first_name[..first.stem.len()].to_string(),
            PartStyle::RarPart => first_name.to_string(),
        };

        LogicalArchive {
            name,
            parts: siblings
                .into_iter()
                .map(|(_, name)| self.dir.join(name))
                .collect(),
            multipart: true,
        }
    }
}
