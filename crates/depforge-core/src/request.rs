//! The description of what and how should be built.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::shell::IoRedirects;
use crate::version::SrcVersion;

/// The default timeout for both the version-set and the build command:
/// 5 minutes.
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Errors raised when finishing a [`BuildRequestBuilder`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// No SCM URL was given; there is nothing to check out from.
    #[error("a build request needs at least one SCM URL")]
    NoScmUrls,
}

/// The verbosity level a builder should run the build tool with. How the
/// levels map onto tool flags is up to the individual builder.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Verbosity {
    /// Most detailed output.
    Trace,
    /// Debug output.
    Debug,
    /// The default level.
    #[default]
    Info,
    /// Warnings only.
    Warn,
    /// Errors only.
    Error,
}

/// An immutable description of one build: where to check out from, which
/// version, and how to drive the build tool.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    project_root_directory: PathBuf,
    src_version: SrcVersion,
    scm_urls: Vec<String>,
    build_arguments: Vec<String>,
    skip_tests: bool,
    add_default_build_arguments: bool,
    forward_properties: Vec<String>,
    build_environment: HashMap<String, String>,
    verbosity: Verbosity,
    io_redirects: IoRedirects,
    timeout: Duration,
}

impl BuildRequest {
    /// Starts building a request for checking out `src_version` into
    /// `project_root_directory`.
    #[must_use]
    pub fn builder(
        project_root_directory: impl Into<PathBuf>,
        src_version: SrcVersion,
    ) -> BuildRequestBuilder {
        BuildRequestBuilder {
            project_root_directory: project_root_directory.into(),
            src_version,
            scm_urls: Vec::new(),
            build_arguments: Vec::new(),
            skip_tests: true,
            add_default_build_arguments: true,
            forward_properties: Vec::new(),
            build_environment: HashMap::new(),
            verbosity: Verbosity::Info,
            io_redirects: IoRedirects::inherit_all(),
            timeout: DEFAULT_BUILD_TIMEOUT,
        }
    }

    /// The root directory of the source tree to check out and build.
    #[must_use]
    pub fn project_root_directory(&self) -> &Path {
        &self.project_root_directory
    }

    /// The source version to check out and build.
    #[must_use]
    pub fn src_version(&self) -> &SrcVersion {
        &self.src_version
    }

    /// The SCM URLs to try one after another; the first success wins.
    /// Guaranteed non-empty.
    #[must_use]
    pub fn scm_urls(&self) -> &[String] {
        &self.scm_urls
    }

    /// Explicit build arguments, combined with the builder's defaults when
    /// [`Self::add_default_build_arguments`] holds.
    #[must_use]
    pub fn build_arguments(&self) -> &[String] {
        &self.build_arguments
    }

    /// Whether the build should skip running tests.
    #[must_use]
    pub fn skip_tests(&self) -> bool {
        self.skip_tests
    }

    /// Whether the builder's default arguments should be merged in.
    #[must_use]
    pub fn add_default_build_arguments(&self) -> bool {
        self.add_default_build_arguments
    }

    /// Property names to forward into the child build; a trailing `*`
    /// makes a name a prefix pattern.
    #[must_use]
    pub fn forward_properties(&self) -> &[String] {
        &self.forward_properties
    }

    /// Environment overlay for the spawned build commands.
    #[must_use]
    pub fn build_environment(&self) -> &HashMap<String, String> {
        &self.build_environment
    }

    /// The verbosity level for the build tool.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// The I/O redirection for the spawned build commands.
    #[must_use]
    pub fn io_redirects(&self) -> &IoRedirects {
        &self.io_redirects
    }

    /// The timeout for each spawned build command.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Builder for [`BuildRequest`].
#[derive(Debug, Clone)]
pub struct BuildRequestBuilder {
    project_root_directory: PathBuf,
    src_version: SrcVersion,
    scm_urls: Vec<String>,
    build_arguments: Vec<String>,
    skip_tests: bool,
    add_default_build_arguments: bool,
    forward_properties: Vec<String>,
    build_environment: HashMap<String, String>,
    verbosity: Verbosity,
    io_redirects: IoRedirects,
    timeout: Duration,
}

impl BuildRequestBuilder {
    /// Adds one SCM URL to try.
    #[must_use]
    pub fn scm_url(mut self, scm_url: impl Into<String>) -> Self {
        self.scm_urls.push(scm_url.into());
        self
    }

    /// Adds all given SCM URLs, keeping their order.
    #[must_use]
    pub fn scm_urls<I, S>(mut self, scm_urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scm_urls.extend(scm_urls.into_iter().map(Into::into));
        self
    }

    /// Adds one explicit build argument.
    #[must_use]
    pub fn build_argument(mut self, argument: impl Into<String>) -> Self {
        self.build_arguments.push(argument.into());
        self
    }

    /// Adds all given build arguments.
    #[must_use]
    pub fn build_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.build_arguments
            .extend(arguments.into_iter().map(Into::into));
        self
    }

    /// Sets whether tests are skipped (default: `true`).
    #[must_use]
    pub fn skip_tests(mut self, skip_tests: bool) -> Self {
        self.skip_tests = skip_tests;
        self
    }

    /// Sets whether the builder's defaults are merged in (default: `true`).
    #[must_use]
    pub fn add_default_build_arguments(mut self, add: bool) -> Self {
        self.add_default_build_arguments = add;
        self
    }

    /// Adds property names (or trailing-`*` prefixes) to forward.
    #[must_use]
    pub fn forward_properties<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forward_properties
            .extend(names.into_iter().map(Into::into));
        self
    }

    /// Adds one environment overlay entry.
    #[must_use]
    pub fn build_environment_variable(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.build_environment.insert(name.into(), value.into());
        self
    }

    /// Sets the verbosity level (default: [`Verbosity::Info`]).
    #[must_use]
    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Sets the I/O redirection (default: inherit all).
    #[must_use]
    pub fn io_redirects(mut self, io_redirects: IoRedirects) -> Self {
        self.io_redirects = io_redirects;
        self
    }

    /// Sets the command timeout (default: 5 minutes).
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Finishes the build.
    ///
    /// # Errors
    ///
    /// [`RequestError::NoScmUrls`] when no URL was added.
    pub fn build(self) -> Result<BuildRequest, RequestError> {
        if self.scm_urls.is_empty() {
            return Err(RequestError::NoScmUrls);
        }
        Ok(BuildRequest {
            project_root_directory: self.project_root_directory,
            src_version: self.src_version,
            scm_urls: self.scm_urls,
            build_arguments: self.build_arguments,
            skip_tests: self.skip_tests,
            add_default_build_arguments: self.add_default_build_arguments,
            forward_properties: self.forward_properties,
            build_environment: self.build_environment,
            verbosity: self.verbosity,
            io_redirects: self.io_redirects,
            timeout: self.timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn version(raw: &str) -> SrcVersion {
        SrcVersion::parse(raw).unwrap().unwrap()
    }

    #[test]
    fn verbosity_parses_case_insensitively() {
        assert_eq!(Verbosity::from_str("trace").unwrap(), Verbosity::Trace);
        assert_eq!(Verbosity::from_str("WARN").unwrap(), Verbosity::Warn);
        assert!(Verbosity::from_str("loud").is_err());
    }

    #[test]
    fn request_defaults() {
        let request = BuildRequest::builder("/tmp/build", version("1.0-SRC-tag-v1.0"))
            .scm_url("git:https://example.org/acme.git")
            .build()
            .unwrap();
        assert!(request.skip_tests());
        assert!(request.add_default_build_arguments());
        assert_eq!(request.verbosity(), Verbosity::Info);
        assert_eq!(request.timeout(), DEFAULT_BUILD_TIMEOUT);
        assert!(request.build_arguments().is_empty());
        assert!(request.forward_properties().is_empty());
    }

    #[test]
    fn request_without_urls_is_rejected() {
        let result = BuildRequest::builder("/tmp/build", version("1.0-SRC-tag-v1.0")).build();
        assert_eq!(result.unwrap_err(), RequestError::NoScmUrls);
    }
}
