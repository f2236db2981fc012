//! Source control checkout.
//!
//! An [`Scm`] implementation announces which URLs it understands via
//! [`Scm::supports`] and populates a build workspace via [`Scm::checkout`].
//! Implementations are picked by the build service in registration order;
//! the first supporting one wins.
//!
//! URLs are prefixed with the implementation's scheme (e.g.
//! `git:https://example.org/acme.git`); the prefix is stripped before the
//! underlying SCM sees the URL.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::request::BuildRequest;

mod git;

pub use git::{GitScm, SCM_GIT_PREFIX};

/// Errors raised while checking sources out.
#[derive(Debug, Error)]
pub enum ScmError {
    /// No registered implementation supports the URL.
    #[error("no SCM implementation found for URL [{url}]")]
    NoProvider {
        /// The URL nobody claimed.
        url: String,
    },

    /// The underlying SCM operation failed.
    #[error("could not check out from URL [{url}]: {source}")]
    Checkout {
        /// The URL the checkout ran against (scheme prefix stripped).
        url: String,
        /// The underlying Git error.
        #[source]
        source: git2::Error,
    },

    /// The requested ref was not advertised by the URL being tried.
    #[error("ref '{reference}' was not advertised by URL [{url}]")]
    RefNotAdvertised {
        /// The URL that did not advertise the ref.
        url: String,
        /// The branch or tag name that was asked for.
        reference: String,
    },

    /// The requested commit is not reachable from anything fetched from
    /// the URL being tried.
    #[error("revision '{revision}' was not found in history fetched from URL [{url}]")]
    RevisionNotFound {
        /// The URL whose fetched history was searched.
        url: String,
        /// The commit id that was asked for.
        revision: String,
    },

    /// The version element's type means nothing to this implementation.
    #[error("version type '{version_type}' is not supported by the {scm} SCM")]
    UnsupportedVersionType {
        /// The implementation that refused.
        scm: &'static str,
        /// The offending version type.
        version_type: String,
    },

    /// The checkout directory could not be prepared.
    #[error("could not prepare checkout directory [{}]: {source}", path.display())]
    Workspace {
        /// The directory that could not be prepared.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// One source control implementation.
pub trait Scm: Send + Sync {
    /// Whether this implementation understands the given prefixed URL.
    fn supports(&self, url: &str) -> bool;

    /// Populates `request.project_root_directory()` with the sources of
    /// `request.src_version()`, trying `request.scm_urls()` in order.
    ///
    /// # Errors
    ///
    /// The *last* URL's error once every URL has failed; earlier failures
    /// are logged, not surfaced.
    fn checkout(&self, request: &BuildRequest) -> Result<(), ScmError>;
}
