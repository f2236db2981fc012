//! Thread-level and OS-process-level exclusive access to filesystem paths.
//!
//! A single process may run many build requests concurrently while the same
//! machine may run several independent build processes, so exclusivity is
//! composed of two ownership layers: a process-wide registry of per-path
//! thread locks, and an OS advisory lock on a sibling `<path>.lock` file.
//! The thread layer exists because the advisory lock is process-granular
//! and two threads of one process racing on it could starve each other.

use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};

use fs2::FileExt;
use thiserror::Error;

/// Errors raised when acquiring a [`PathLock`].
#[derive(Debug, Error)]
pub enum LockError {
    /// The path is currently held by somebody else and waiting would be
    /// wrong: either another thread of this process holds it for a
    /// *different* metadata, or another OS process holds the advisory lock.
    #[error("could not lock path [{}]: {detail}", path.display())]
    Busy {
        /// The path that could not be locked.
        path: PathBuf,
        /// Who excluded us.
        detail: String,
    },

    /// The lock file could not be created, opened or locked for I/O
    /// reasons.
    #[error("could not create or lock lock file [{}]: {source}", path.display())]
    Io {
        /// The lock file path.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The directory to lock could not be created.
    #[error("could not create directory [{}]: {source}", path.display())]
    DirectoryCreate {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

struct EntryState<M> {
    locked: bool,
    metadata: M,
}

/// One registry entry: the held-flag plus the metadata of the most recent
/// holder, with a condvar for callers allowed to wait.
struct PathEntry<M> {
    state: Mutex<EntryState<M>>,
    unlocked: Condvar,
}

fn lock_state<M>(entry: &PathEntry<M>) -> MutexGuard<'_, EntryState<M>> {
    entry.state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Grants exclusive, dual-level access to filesystem paths.
///
/// The metadata type `M` describes *what* a path is being locked for
/// (typically the source version being built there). Whether a second
/// in-process caller may wait for the path depends on whether its metadata
/// equals the current holder's:
///
/// | thread-held | same metadata | OS-held | outcome                          |
/// |-------------|---------------|---------|----------------------------------|
/// | yes         | yes           | no      | waits, then locks                |
/// | yes         | no            | –       | [`LockError::Busy`] immediately  |
/// | no          | –             | yes     | [`LockError::Busy`] immediately  |
/// | no          | –             | no      | locks immediately                |
///
/// The registry grows monotonically: entries are never removed, since the
/// set of build workspace paths a process touches is small and bounded.
pub struct PathLocker<M> {
    locks: Mutex<HashMap<PathBuf, Arc<PathEntry<M>>>>,
}

impl<M> Default for PathLocker<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> PathLocker<M> {
    /// Creates an empty locker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }
}

impl<M> PathLocker<M>
where
    M: Clone + Eq + fmt::Debug,
{
    /// Acquires both the thread-level and the OS-level lock for `path`,
    /// creating the directory first if needed.
    ///
    /// When another thread of this process holds the path for an *equal*
    /// `metadata`, the call blocks (arbitrarily long) until that holder
    /// releases — the holder is building the very same version, so the
    /// path will be warm and free afterwards. Any other contention fails
    /// immediately; the failure is point-in-time and is not retried when
    /// the holder releases.
    ///
    /// On success the stored metadata is overwritten with `metadata` and
    /// the returned [`PathLock`] owns the path until released or dropped.
    ///
    /// # Errors
    ///
    /// [`LockError::DirectoryCreate`] if the directory cannot be created,
    /// [`LockError::Busy`] on contention, [`LockError::Io`] if the lock
    /// file misbehaves.
    pub fn lock_directory(&self, path: &Path, metadata: M) -> Result<PathLock<M>, LockError> {
        self.acquire(path, metadata, true)
    }

    /// Like [`Self::lock_directory`] but never waits, not even for an
    /// equal-metadata holder.
    ///
    /// # Errors
    ///
    /// As [`Self::lock_directory`], with [`LockError::Busy`] for any
    /// thread-level contention.
    pub fn try_lock_directory(&self, path: &Path, metadata: M) -> Result<PathLock<M>, LockError> {
        self.acquire(path, metadata, false)
    }

    fn acquire(&self, path: &Path, metadata: M, may_wait: bool) -> Result<PathLock<M>, LockError> {
        super::ensure_directory_exists(path).map_err(|source| LockError::DirectoryCreate {
            path: path.to_path_buf(),
            source,
        })?;

        let entry = self.entry_for(path, &metadata);

        {
            let mut state = lock_state(&entry);
            if state.locked {
                // The wait-or-fail decision is made once, against the
                // holder's metadata at this instant; a waiter then stays a
                // waiter until the path frees.
                if !(may_wait && state.metadata == metadata) {
                    return Err(LockError::Busy {
                        path: path.to_path_buf(),
                        detail: format!(
                            "locked by another thread of this process for {:?}",
                            state.metadata
                        ),
                    });
                }
                while state.locked {
                    state = entry
                        .unlocked
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
            state.locked = true;
            state.metadata = metadata.clone();
        }
        tracing::debug!("locked on thread level {}", path.display());

        match Self::lock_in_filesystem(path) {
            Ok((file, lock_file_path)) => Ok(PathLock {
                path: path.to_path_buf(),
                lock_file_path,
                file: Some(file),
                entry,
            }),
            Err(error) => {
                release_thread_level(&entry);
                Err(error)
            }
        }
    }

    fn entry_for(&self, path: &Path, metadata: &M) -> Arc<PathEntry<M>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(path.to_path_buf()).or_insert_with(|| {
            Arc::new(PathEntry {
                state: Mutex::new(EntryState {
                    locked: false,
                    metadata: metadata.clone(),
                }),
                unlocked: Condvar::new(),
            })
        }))
    }

    fn lock_in_filesystem(path: &Path) -> Result<(File, PathBuf), LockError> {
        let lock_file_path = lock_file_path(path);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_file_path)
            .map_err(|source| LockError::Io {
                path: lock_file_path.clone(),
                source,
            })?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                tracing::debug!("locked on filesystem level {}", path.display());
                Ok((file, lock_file_path))
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => Err(LockError::Busy {
                path: lock_file_path,
                detail: "locked by another process".to_string(),
            }),
            Err(source) => Err(LockError::Io {
                path: lock_file_path,
                source,
            }),
        }
    }
}

/// The sibling lock file of a locked path: `<path>.lock`.
fn lock_file_path(path: &Path) -> PathBuf {
    let mut name = match path.file_name() {
        Some(name) => name.to_os_string(),
        None => OsString::from("path"),
    };
    name.push(".lock");
    path.with_file_name(name)
}

fn release_thread_level<M>(entry: &PathEntry<M>) {
    let mut state = lock_state(entry);
    state.locked = false;
    drop(state);
    entry.unlocked.notify_all();
}

/// Exclusive holdership of one filesystem path.
///
/// Released exactly once, either explicitly via [`Self::release`] or when
/// dropped, so every exit path of a holder gives the path back. I/O
/// trouble while closing the lock file is logged, never propagated.
pub struct PathLock<M> {
    path: PathBuf,
    lock_file_path: PathBuf,
    file: Option<File>,
    entry: Arc<PathEntry<M>>,
}

impl<M> PathLock<M> {
    /// The path this lock grants exclusive access to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Releases the lock: the OS-level handle first, then the thread
    /// level.
    pub fn release(self) {
        // Drop does the work.
        drop(self);
    }
}

impl<M> Drop for PathLock<M> {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            if let Err(error) = FileExt::unlock(&file) {
                tracing::warn!(
                    "could not unlock lock file [{}]: {error}",
                    self.lock_file_path.display()
                );
            }
            drop(file);
            release_thread_level(&self.entry);
            tracing::debug!("released lock on {}", self.path.display());
        }
    }
}

impl<M> fmt::Debug for PathLock<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathLock").field("path", &self.path).finish()
    }
}
