//! The on-disk layout of build workspaces.
//!
//! Each project to build gets a build home under the root directory,
//! derived from the project's identifier (e.g. `org.acme.component` becomes
//! `org/acme/component`). Under that home, concurrent builds of the same
//! project occupy numbered slot subdirectories, each locked individually.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::path_lock::{LockError, PathLock, PathLocker};

/// The maximal number of slot subdirectories opened under one project
/// build home. Reaching the bound signals a lock leak or runaway
/// concurrency, not normal contention.
pub const DEFAULT_CONCURRENCY_THRESHOLD: u32 = 256;

/// Errors raised while allocating a build workspace.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    /// Every slot in the search space was busy.
    #[error(
        "could not lock any of the 0..{threshold} slot directories under [{}]; \
         this hints at leaked locks or runaway concurrency",
        project_home.display()
    )]
    NoSlotAvailable {
        /// The project build home whose slots were exhausted.
        project_home: PathBuf,
        /// The configured slot bound.
        threshold: u32,
        /// The failure of the last slot tried.
        #[source]
        last: Option<LockError>,
    },

    /// The project build home could not be created.
    #[error("could not create directory [{}]: {source}", path.display())]
    DirectoryCreate {
        /// The directory that could not be created.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A slot failed for a reason other than contention.
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Finds, creates and locks numbered workspace slots under a root
/// directory.
pub struct BuildDirectories<M> {
    root: PathBuf,
    locker: Arc<PathLocker<M>>,
    concurrency_threshold: u32,
}

impl<M> BuildDirectories<M>
where
    M: Clone + Eq + fmt::Debug,
{
    /// Creates a manager rooted at `root`, locking through `locker`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, locker: Arc<PathLocker<M>>) -> Self {
        Self {
            root: root.into(),
            locker,
            concurrency_threshold: DEFAULT_CONCURRENCY_THRESHOLD,
        }
    }

    /// Overrides the slot bound.
    #[must_use]
    pub fn concurrency_threshold(mut self, concurrency_threshold: u32) -> Self {
        self.concurrency_threshold = concurrency_threshold;
        self
    }

    /// The root directory all build homes live under.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Walks slots `0..threshold` under `<root>/<project_build_home>` and
    /// returns the first one that could be locked for `metadata`.
    ///
    /// A slot held by another thread for an *equal* metadata is waited for
    /// (the locker serializes same-version builds); a slot held for a
    /// different metadata or by another process is skipped for the next
    /// number.
    ///
    /// # Errors
    ///
    /// [`WorkspaceError::DirectoryCreate`] if the build home cannot be
    /// created, [`WorkspaceError::NoSlotAvailable`] when the search space
    /// is exhausted, [`WorkspaceError::Lock`] on non-contention lock
    /// failures.
    pub fn open_build_directory(
        &self,
        project_build_home: &Path,
        metadata: M,
    ) -> Result<PathLock<M>, WorkspaceError> {
        let project_home = self.root.join(project_build_home);
        super::ensure_directory_exists(&project_home).map_err(|source| {
            WorkspaceError::DirectoryCreate {
                path: project_home.clone(),
                source,
            }
        })?;

        let mut last = None;
        for slot in 0..self.concurrency_threshold {
            let candidate = project_home.join(slot.to_string());
            match self.locker.lock_directory(&candidate, metadata.clone()) {
                Ok(lock) => return Ok(lock),
                Err(busy @ LockError::Busy { .. }) => {
                    // Never mind, the next slot may be free.
                    tracing::debug!("could not lock slot {}", candidate.display());
                    last = Some(busy);
                }
                Err(error) => return Err(error.into()),
            }
        }

        Err(WorkspaceError::NoSlotAvailable {
            project_home,
            threshold: self.concurrency_threshold,
            last,
        })
    }
}
