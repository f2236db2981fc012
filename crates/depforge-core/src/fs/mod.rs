//! Filesystem concerns: exclusive path locking and the build directory
//! layout.
//!
//! [`PathLocker`] guarantees both thread-level and OS-process-level
//! exclusive access to a filesystem path. [`BuildDirectories`] maps a
//! logical project onto a bounded set of numbered, individually lockable
//! workspace slots.

use std::io;
use std::path::Path;
use std::thread;
use std::time::Duration;

mod build_dirs;
mod path_lock;

pub use build_dirs::{BuildDirectories, WorkspaceError, DEFAULT_CONCURRENCY_THRESHOLD};
pub use path_lock::{LockError, PathLock, PathLocker};

/// The number of attempts when creating a directory.
const CREATE_RETRY_COUNT: u32 = 256;

/// Makes sure the given directory exists, retrying up to
/// [`CREATE_RETRY_COUNT`] times.
///
/// The retry tolerates transient `PermissionDenied` races some platforms
/// exhibit when several processes create the same directory tree at once.
///
/// # Errors
///
/// The last I/O error once the attempts are exhausted.
pub fn ensure_directory_exists(dir: &Path) -> io::Result<()> {
    let mut last_error = None;
    for _ in 0..CREATE_RETRY_COUNT {
        match std::fs::create_dir_all(dir) {
            Ok(()) => {
                if dir.exists() {
                    return Ok(());
                }
            }
            Err(error) if error.kind() == io::ErrorKind::PermissionDenied => {
                thread::sleep(Duration::from_millis(10));
                last_error = Some(error);
            }
            Err(error) => last_error = Some(error),
        }
    }
    Err(last_error.unwrap_or_else(|| {
        io::Error::other(format!(
            "could not create directory [{}] attempting [{CREATE_RETRY_COUNT}] times",
            dir.display()
        ))
    }))
}

/// If the given directory does not exist, creates it; otherwise deletes
/// everything inside it.
///
/// # Errors
///
/// Any I/O error from creating the directory or deleting its contents.
pub fn ensure_directory_exists_and_empty(dir: &Path) -> io::Result<()> {
    if dir.exists() {
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            if path.is_dir() {
                std::fs::remove_dir_all(&path)?;
            } else {
                std::fs::remove_file(&path)?;
            }
        }
        Ok(())
    } else {
        ensure_directory_exists(dir)
    }
}

/// Deletes a file or directory recursively if it exists.
///
/// # Errors
///
/// Any I/O error from the deletion.
pub fn delete_directory(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        std::fs::remove_dir_all(dir)
    } else if dir.exists() {
        std::fs::remove_file(dir)
    } else {
        Ok(())
    }
}
