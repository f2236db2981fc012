//! # depforge-core
//!
//! Builds a versioned artifact straight from its source-control history
//! when the artifact is not already present in a binary repository, and
//! hands the result back to the calling build tool.
//!
//! The engine is deliberately synchronous: each [`BuildRequest`] is
//! processed on the calling thread, and callers decide how many requests
//! run concurrently. What the crate guarantees is resource coordination —
//! a workspace directory is never touched without holding its
//! [`fs::PathLock`], which excludes both other threads of this process and
//! other processes on this machine.
//!
//! A typical round trip:
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use depforge_core::fs::{BuildDirectories, PathLocker};
//! use depforge_core::{BuildRequest, BuildService, SrcVersion};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let version = SrcVersion::parse("1.2.3-SRC-tag-v1.2.3")?
//!     .ok_or("not a source version")?;
//!
//! let build_dirs = BuildDirectories::new("/var/cache/depforge", Arc::new(PathLocker::new()));
//! let workspace = build_dirs.open_build_directory(Path::new("org/acme/component"), version.clone())?;
//!
//! let request = BuildRequest::builder(workspace.path(), version)
//!     .scm_url("git:https://github.com/acme/component.git")
//!     .build()?;
//! BuildService::with_defaults().build(&request)?;
//! # Ok(())
//! # }
//! ```

pub mod build;
pub mod error;
pub mod fs;
pub mod request;
pub mod scm;
pub mod service;
pub mod shell;
pub mod version;

pub use error::BuildError;
pub use request::{BuildRequest, BuildRequestBuilder, RequestError, Verbosity};
pub use service::BuildService;
pub use version::{SrcVersion, VersionError, WellKnownType};
