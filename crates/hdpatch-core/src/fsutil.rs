//! Filesystem helpers shared by the manifest, migration and cleanup steps.
//!
//! Clearing the read-only attribute only ever adds the owner-write bit, and
//! only on the paths about to be mutated.

use std::fs;
use std::io;
use std::path::Path;

/// Make a single path writable if it is currently read-only.
///
/// Missing paths are ignored.
pub fn ensure_writable(path: &Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    if metadata.file_type().is_symlink() {
        return Ok(());
    }

    let mut perms = metadata.permissions();
    if !perms.readonly() {
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        perms.set_mode(perms.mode() | 0o200);
    }
    #[cfg(not(unix))]
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);

    fs::set_permissions(path, perms)
}

/// Make `path` and, for directories, everything below it writable.
///
/// Symlinks are never followed, so nothing outside `path` is touched.
/// Individual failures are skipped; the subsequent removal reports them.
pub fn make_writable_recursive(path: &Path) {
    let Ok(metadata) = fs::symlink_metadata(path) else {
        return;
    };
    if metadata.is_dir() {
        for entry in walkdir::WalkDir::new(path)
            .into_iter()
            .filter_map(Result::ok)
        {
            let _ = ensure_writable(entry.path());
        }
    } else {
        let _ = ensure_writable(path);
    }
}

/// Remove a file or a directory tree.
pub fn remove_path(path: &Path) -> io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

/// Remove a file, ignoring every failure.
pub fn remove_file_quietly(path: &Path) -> bool {
    fs::remove_file(path).is_ok()
}
