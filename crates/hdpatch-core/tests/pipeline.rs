//! End-to-end runs over a temporary install, with zip standing in for the
//! archiver and a copy standing in for the diff tool.

use std::fs::{self, File};
use std::io::{Cursor, Write};
use std::path::Path;

use hdpatch_core::install_config::InstallConfig;
use hdpatch_core::paths::WorkTree;
use hdpatch_core::tools::{Archiver, DiffTool};
use hdpatch_core::{PatchError, Patcher, ToolError, Version};
use tempfile::{TempDir, tempdir};
use zip::write::SimpleFileOptions;

struct ZipArchiver;

impl Archiver for ZipArchiver {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ToolError> {
        let failed = |stderr: String| ToolError::Failed {
            tool: "zip".to_string(),
            code: None,
            stderr,
        };
        let file = File::open(archive).map_err(|e| failed(e.to_string()))?;
        let mut zip = zip::ZipArchive::new(file).map_err(|e| failed(e.to_string()))?;
        zip.extract(dest).map_err(|e| failed(e.to_string()))
    }
}

/// "Applies" a diff by replacing the original with the diff's contents.
struct CopyDiff;

impl DiffTool for CopyDiff {
    fn apply(&self, original: &Path, diff: &Path) -> Result<(), ToolError> {
        fs::copy(diff, original)
            .map(|_| ())
            .map_err(|e| ToolError::Spawn {
                tool: "copy".to_string(),
                source: e,
            })
    }
}

struct FailingDiff;

impl DiffTool for FailingDiff {
    fn apply(&self, _original: &Path, _diff: &Path) -> Result<(), ToolError> {
        Err(ToolError::Failed {
            tool: "hpatchz".to_string(),
            code: Some(1),
            stderr: "checksum mismatch".to_string(),
        })
    }
}

fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(contents).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn write_zip(path: &Path, entries: &[(&str, &str)]) {
    let entries: Vec<(&str, &[u8])> = entries
        .iter()
        .map(|(name, contents)| (*name, contents.as_bytes()))
        .collect();
    fs::write(path, zip_bytes(&entries)).unwrap();
}

fn install() -> (TempDir, WorkTree) {
    let dir = tempdir().unwrap();
    let tree = WorkTree::new(dir.path(), "StarRail_Data");
    fs::create_dir_all(tree.game_dir()).unwrap();
    fs::write(tree.game_dir().join("data.bin"), b"old").unwrap();
    (dir, tree)
}

#[test]
fn test_update_across_audio_layout_boundary() {
    let (_dir, tree) = install();
    let legacy = tree.legacy_audio_dir();
    fs::create_dir_all(legacy.join("English")).unwrap();
    fs::write(legacy.join("Banks0.pck"), b"bank").unwrap();
    fs::write(legacy.join("English/Vo0.pck"), b"vo").unwrap();
    fs::write(tree.game_dir().join("keep.bin"), b"keep").unwrap();
    fs::create_dir_all(tree.game_dir().join("webCaches/Cache")).unwrap();
    fs::write(tree.work_dir().join("hpatchz.exe"), b"tool").unwrap();

    write_zip(
        &tree.work_dir().join("Game_3.5.0_3.6.0.zip"),
        &[
            ("hdifffiles.txt", "{\"remoteName\": \"StarRail_Data/data.bin\"}\n"),
            ("deletefiles.txt", "StarRail_Data/keep.bin\n"),
            ("StarRail_Data/data.bin.hdiff", "new"),
            ("StarRail_Data/StreamingAssets/BinaryVersion.bytes", "3.6.0"),
        ],
    );

    let patcher = Patcher::new(tree.clone(), ZipArchiver, CopyDiff);
    let summary = patcher.run().unwrap();

    assert!(summary.patched);
    assert_eq!(summary.archives.len(), 1);
    assert!(summary.archives[0].migration.as_ref().unwrap().is_complete());
    assert_eq!(summary.installed_version, Some(Version::new(3, 6, 0)));

    // Patched in place, artifact consumed.
    assert_eq!(fs::read(tree.game_dir().join("data.bin")).unwrap(), b"new");
    assert!(!tree.game_dir().join("data.bin.hdiff").exists());

    // Audio merged into the new layout, old tree and its parents gone.
    let assets = tree.audio_assets_dir();
    assert_eq!(fs::read(assets.join("Banks0.pck")).unwrap(), b"bank");
    assert_eq!(fs::read(assets.join("English/Vo0.pck")).unwrap(), b"vo");
    assert!(!tree.streaming_assets().join("Audio").exists());

    // The delete manifest is not processed on a migration run.
    assert!(tree.game_dir().join("keep.bin").exists());

    assert_eq!(
        InstallConfig::read_version(&tree.install_config()),
        Some(Version::new(3, 6, 0))
    );
    assert!(!tree.work_dir().join("Game_3.5.0_3.6.0.zip").exists());
    assert!(!tree.diff_manifest().exists());
    assert!(!tree.delete_manifest().exists());
    assert!(!tree.work_dir().join("hpatchz.exe").exists());
    assert!(!tree.game_dir().join("webCaches").exists());
}

#[test]
fn test_second_run_is_a_no_op() {
    let (_dir, tree) = install();
    write_zip(
        &tree.work_dir().join("Game_3.6.0_3.7.0.zip"),
        &[
            ("hdifffiles.txt", "StarRail_Data/data.bin\n"),
            ("StarRail_Data/data.bin.hdiff", "new"),
            ("StarRail_Data/version_info", "OSRELWin3.7.0_R123"),
        ],
    );

    let patcher = Patcher::new(tree.clone(), ZipArchiver, CopyDiff);
    let first = patcher.run().unwrap();
    assert!(first.patched);
    let record = fs::read_to_string(tree.install_config()).unwrap();

    let second = patcher.run().unwrap();
    assert!(!second.patched);
    assert!(second.archives.is_empty());
    assert_eq!(second.installed_version, None);
    assert_eq!(fs::read_to_string(tree.install_config()).unwrap(), record);
    assert_eq!(fs::read(tree.game_dir().join("data.bin")).unwrap(), b"new");
}

#[test]
fn test_multipart_archive_consumes_every_part() {
    let (_dir, tree) = install();
    fs::write(tree.game_dir().join("obsolete.bin"), b"x").unwrap();
    write_zip(
        &tree.work_dir().join("Game_3.6.0_3.7.0.zip.001"),
        &[
            ("deletefiles.txt", "StarRail_Data/obsolete.bin\n"),
            ("hdifffiles.txt", "StarRail_Data/data.bin\n"),
            ("StarRail_Data/data.bin.hdiff", "new"),
        ],
    );
    fs::write(tree.work_dir().join("Game_3.6.0_3.7.0.zip.002"), b"tail").unwrap();

    let summary = Patcher::new(tree.clone(), ZipArchiver, CopyDiff)
        .run()
        .unwrap();

    assert_eq!(summary.archives.len(), 1);
    assert_eq!(summary.archives[0].name, "Game_3.6.0_3.7.0.zip");
    assert!(summary.archives[0].migration.is_none());
    assert!(!tree.work_dir().join("Game_3.6.0_3.7.0.zip.001").exists());
    assert!(!tree.work_dir().join("Game_3.6.0_3.7.0.zip.002").exists());
    assert!(!tree.game_dir().join("obsolete.bin").exists());
    assert_eq!(fs::read(tree.game_dir().join("data.bin")).unwrap(), b"new");
}

#[test]
fn test_diff_failure_aborts_the_run() {
    let (_dir, tree) = install();
    write_zip(
        &tree.work_dir().join("Game_3.6.0_3.7.0.zip"),
        &[
            ("hdifffiles.txt", "StarRail_Data/data.bin\n"),
            ("StarRail_Data/data.bin.hdiff", "new"),
        ],
    );
    fs::write(tree.work_dir().join("7z.exe"), b"tool").unwrap();

    let err = Patcher::new(tree.clone(), ZipArchiver, FailingDiff)
        .run()
        .unwrap_err();

    assert!(matches!(err, PatchError::DiffApply { .. }));
    assert!(!err.is_setup());
    assert!(tree.diff_manifest().exists());
    assert!(!tree.install_config().exists());
    assert!(tree.work_dir().join("7z.exe").exists());
}

#[test]
fn test_no_cleanup_keeps_artifacts_but_records_version() {
    let (_dir, tree) = install();
    fs::write(tree.work_dir().join("hpatchz.exe"), b"tool").unwrap();
    fs::create_dir_all(tree.game_dir().join("SDKCaches")).unwrap();
    fs::write(tree.game_dir().join("SDKCaches/c.bin"), b"c").unwrap();
    write_zip(
        &tree.work_dir().join("Game_3.6.0_3.7.0.zip"),
        &[
            ("hdifffiles.txt", "StarRail_Data/data.bin\n"),
            ("StarRail_Data/data.bin.hdiff", "new"),
            ("StarRail_Data/version_info", "3.7.0"),
        ],
    );

    let summary = Patcher::new(tree.clone(), ZipArchiver, CopyDiff)
        .with_cleanup(false)
        .run()
        .unwrap();

    assert!(summary.cleanup.files.is_empty());
    assert!(tree.work_dir().join("hpatchz.exe").exists());
    assert!(tree.game_dir().join("SDKCaches/c.bin").exists());
    assert_eq!(
        InstallConfig::read_version(&tree.install_config()),
        Some(Version::new(3, 7, 0))
    );
}

#[test]
fn test_unreadable_archive_is_skipped_and_removed() {
    let (_dir, tree) = install();
    fs::write(tree.work_dir().join("broken.zip"), b"not a zip").unwrap();
    fs::create_dir_all(tree.game_dir().join("empty/nested")).unwrap();

    let summary = Patcher::new(tree.clone(), ZipArchiver, CopyDiff)
        .run()
        .unwrap();

    assert!(!summary.archives[0].extracted);
    assert!(!summary.patched);
    assert!(!tree.work_dir().join("broken.zip").exists());
    assert!(!tree.install_config().exists());
    assert!(!tree.game_dir().join("empty").exists());
    assert_eq!(fs::read(tree.game_dir().join("data.bin")).unwrap(), b"old");
}

#[test]
fn test_archive_inside_multipart_set_is_applied() {
    let (_dir, tree) = install();
    fs::write(tree.game_dir().join("b.bin"), b"old").unwrap();
    let inner = zip_bytes(&[
        ("hdifffiles.txt", b"StarRail_Data/b.bin\n".as_slice()),
        ("StarRail_Data/b.bin.hdiff", b"new b".as_slice()),
    ]);
    let outer = zip_bytes(&[
        ("hdifffiles.txt", b"StarRail_Data/data.bin\n".as_slice()),
        ("StarRail_Data/data.bin.hdiff", b"new".as_slice()),
        ("inner_3.6.0_3.7.0.zip", inner.as_slice()),
    ]);
    fs::write(tree.work_dir().join("outer_3.6.0_3.7.0.zip.001"), outer).unwrap();
    fs::write(tree.work_dir().join("plain_3.6.0_3.7.0.zip"), zip_bytes(&[])).unwrap();

    let summary = Patcher::new(tree.clone(), ZipArchiver, CopyDiff)
        .run()
        .unwrap();

    let names: Vec<&str> = summary.archives.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["outer_3.6.0_3.7.0.zip", "inner_3.6.0_3.7.0.zip", "plain_3.6.0_3.7.0.zip"]
    );
    assert_eq!(fs::read(tree.game_dir().join("data.bin")).unwrap(), b"new");
    assert_eq!(fs::read(tree.game_dir().join("b.bin")).unwrap(), b"new b");
    assert!(!tree.work_dir().join("inner_3.6.0_3.7.0.zip").exists());
}
