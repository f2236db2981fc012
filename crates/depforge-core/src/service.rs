//! The top-level build entry point.

use crate::build::{Builder, MvnBuilder, MvnwBuilder};
use crate::error::BuildError;
use crate::request::BuildRequest;
use crate::scm::{GitScm, Scm, ScmError};

/// Drives one [`BuildRequest`] from checkout to a built artifact.
///
/// The service owns two ordered registries, read-only after construction:
/// the [`Scm`] implementations, dispatched on the request's first URL, and
/// the [`Builder`] implementations, dispatched on the checked-out
/// directory. The first matching implementation wins in both cases.
pub struct BuildService {
    builders: Vec<Box<dyn Builder>>,
    scms: Vec<Box<dyn Scm>>,
}

impl BuildService {
    /// Creates a service with the given registries, kept in the given
    /// order.
    #[must_use]
    pub fn new(builders: Vec<Box<dyn Builder>>, scms: Vec<Box<dyn Scm>>) -> Self {
        Self { builders, scms }
    }

    /// Creates a service with the stock implementations: Git checkout,
    /// Maven and Maven-wrapper builds.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(
            vec![Box::new(MvnBuilder::new()), Box::new(MvnwBuilder::new())],
            vec![Box::new(GitScm::new())],
        )
    }

    /// Checks the requested version out and builds it.
    ///
    /// Stages run strictly in order — checkout, version rewrite, build —
    /// and the first failing stage aborts the request with its error.
    /// Retries happen only inside the SCM's URL loop.
    ///
    /// # Errors
    ///
    /// [`ScmError::NoProvider`] or [`BuildError::NoBuilder`] when no
    /// implementation claims the request, otherwise the failing stage's
    /// error.
    pub fn build(&self, request: &BuildRequest) -> Result<(), BuildError> {
        let dir = request.project_root_directory();
        let first_url = request.scm_urls().first().map_or("", String::as_str);
        tracing::info!(
            "about to build version {} from {} in {}",
            request.src_version(),
            first_url,
            dir.display()
        );

        let scm = self
            .scms
            .iter()
            .find(|scm| scm.supports(first_url))
            .ok_or_else(|| ScmError::NoProvider {
                url: first_url.to_string(),
            })?;
        scm.checkout(request)?;

        let builder = self
            .builders
            .iter()
            .find(|builder| builder.can_build(dir))
            .ok_or_else(|| BuildError::NoBuilder {
                project_root_directory: dir.to_path_buf(),
            })?;
        tracing::info!("about to build project in {}", dir.display());
        builder.set_versions(request)?;
        builder.build(request)
    }
}
