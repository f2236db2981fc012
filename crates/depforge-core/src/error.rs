//! The crate-level error type.
//!
//! Each concern keeps its own error enum; [`BuildError`] composes them so
//! the orchestrator surfaces exactly one terminal error per request. A
//! failed request never aborts the process — callers log the error and
//! carry on with their other requests.

use std::path::PathBuf;

use thiserror::Error;

use crate::fs::{LockError, WorkspaceError};
use crate::scm::ScmError;
use crate::shell::ShellError;
use crate::version::VersionError;

/// Any failure of one build request.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A bad source version string (fatal, never retried).
    #[error(transparent)]
    Version(#[from] VersionError),

    /// Workspace lock contention or lock I/O trouble (the caller may retry
    /// the whole request later).
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Workspace allocation trouble, including slot exhaustion.
    #[error(transparent)]
    Workspace(#[from] WorkspaceError),

    /// Checkout trouble, after the provider exhausted its URL list.
    #[error(transparent)]
    Scm(#[from] ScmError),

    /// A spawned command could not start, timed out, or exited non-zero.
    #[error(transparent)]
    Shell(#[from] ShellError),

    /// No registered builder can build the checked-out directory.
    #[error("no builder found for project directory [{}]", project_root_directory.display())]
    NoBuilder {
        /// The directory nobody claimed.
        project_root_directory: PathBuf,
    },
}
