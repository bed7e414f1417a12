// crates/overlay-state-core/src/runtime/filesystem.rs
// ============================================================================
// Module: Physical File System
// Description: Local-disk implementation of the FileSystem interface.
// Purpose: Provide crash-safe whole-file replacement for small state files.
// Dependencies: std, crate::interfaces
// ============================================================================

//! ## Overview
//! [`PhysicalFileSystem`] maps the [`FileSystem`] capability onto `std::fs`.
//! Atomic writes go through a uniquely named sibling temp file that is synced
//! before being renamed over the target, followed by a sync of the parent
//! directory so the rename itself is durable.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::fs;
use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::ErrorKind;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use crate::interfaces::FileSystem;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum temp-name collisions tolerated before giving up.
const MAX_TEMP_ATTEMPTS: u32 = 64;

// ============================================================================
// SECTION: Implementation
// ============================================================================

/// [`FileSystem`] backed by the local disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicalFileSystem;

impl FileSystem for PhysicalFileSystem {
    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn dir_exists(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path)
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let Some(parent) = path.parent() else {
            return Err(io::Error::new(ErrorKind::InvalidInput, "path has no parent directory"));
        };
        for attempt in 0 .. MAX_TEMP_ATTEMPTS {
            let temp_path = parent.join(temp_file_name(path, attempt)?);
            match OpenOptions::new().write(true).create_new(true).open(&temp_path) {
                Ok(mut temp_file) => {
                    let written = temp_file
                        .write_all(bytes)
                        .and_then(|()| temp_file.sync_all())
                        .and_then(|()| fs::rename(&temp_path, path));
                    if let Err(err) = written {
                        let _ = fs::remove_file(&temp_path);
                        return Err(err);
                    }
                    sync_directory(parent);
                    return Ok(());
                }
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {}
                Err(err) => return Err(err),
            }
        }
        Err(io::Error::new(ErrorKind::AlreadyExists, "unable to allocate temporary file"))
    }

    fn open_lock_file(&self, path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).truncate(false).write(true).open(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Builds a process-unique temporary sibling name for atomic writes.
fn temp_file_name(path: &Path, attempt: u32) -> io::Result<PathBuf> {
    let Some(base_name) = path.file_name() else {
        return Err(io::Error::new(ErrorKind::InvalidInput, "path has no file name"));
    };
    let mut temp = OsString::from(".tmp-");
    temp.push(base_name);
    temp.push(format!(".{}.{}", std::process::id(), attempt));
    Ok(PathBuf::from(temp))
}

/// Flushes directory metadata so a completed rename survives power loss.
///
/// Platforms that cannot open directories as files skip this step.
fn sync_directory(dir: &Path) {
    if let Ok(handle) = File::open(dir) {
        let _ = handle.sync_all();
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::expect_used,
        clippy::unwrap_used,
        reason = "Test assertions use expect/unwrap for clarity."
    )]

    use std::fs;

    use tempfile::TempDir;

    use super::PhysicalFileSystem;
    use crate::interfaces::FileSystem;

    #[test]
    fn write_atomic_replaces_contents_and_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("state.dat");
        let fs_impl = PhysicalFileSystem;
        fs_impl.write_atomic(&target, b"first").unwrap();
        fs_impl.write_atomic(&target, b"second").unwrap();
        assert_eq!(fs_impl.read(&target).unwrap(), b"second");
        let names: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["state.dat".to_string()]);
    }

    #[test]
    fn file_exists_ignores_directories() {
        let temp = TempDir::new().unwrap();
        let fs_impl = PhysicalFileSystem;
        assert!(!fs_impl.file_exists(temp.path()));
        assert!(!fs_impl.file_exists(&temp.path().join("missing")));
        assert!(fs_impl.dir_exists(temp.path()));
        assert!(!fs_impl.dir_exists(&temp.path().join("missing")));
    }

    #[test]
    fn open_lock_file_creates_without_truncating() {
        let temp = TempDir::new().unwrap();
        let lock_path = temp.path().join("upgrade.lock");
        let fs_impl = PhysicalFileSystem;
        drop(fs_impl.open_lock_file(&lock_path).unwrap());
        assert!(fs_impl.file_exists(&lock_path));
        fs::write(&lock_path, b"held").unwrap();
        drop(fs_impl.open_lock_file(&lock_path).unwrap());
        assert_eq!(fs_impl.read(&lock_path).unwrap(), b"held");
    }
}
