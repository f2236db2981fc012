//! The Maven builders.
//!
//! [`MvnBuilder`] drives a `mvn` from `PATH`; [`MvnwBuilder`] drives the
//! project's own wrapper script. A directory with a POM *and* a wrapper
//! belongs to the wrapper variant, so the plain builder excludes itself
//! there.

use std::path::Path;

use crate::error::BuildError;
use crate::request::BuildRequest;
use crate::shell::{self, ShellCommand};

use super::{forward_property_arguments, maven_verbosity_arguments, merged_build_arguments, Builder};

/// The POM file names Maven recognizes (the polyglot variants included).
const POM_FILE_NAMES: &[&str] = &[
    "pom.xml",
    "pom.atom",
    "pom.clj",
    "pom.groovy",
    "pom.rb",
    "pom.scala",
    "pom.yml",
];

/// The Maven wrapper script names.
const MVNW_FILE_NAMES: &[&str] = &["mvnw", "mvnw.cmd"];

const MVN_DEFAULT_ARGUMENTS: &[&str] = &["clean", "install"];

fn has_pom_file(directory: &Path) -> bool {
    POM_FILE_NAMES
        .iter()
        .any(|name| directory.join(name).exists())
}

fn has_mvnw_file(directory: &Path) -> bool {
    MVNW_FILE_NAMES
        .iter()
        .any(|name| directory.join(name).exists())
}

fn skip_tests_arguments(skip_tests: bool) -> &'static [&'static str] {
    if skip_tests {
        &["-DskipTests"]
    } else {
        &[]
    }
}

fn command(executable: &str, arguments: Vec<String>, request: &BuildRequest) -> ShellCommand {
    ShellCommand::builder(executable, request.project_root_directory())
        .arguments(arguments)
        .environment(request.build_environment())
        .io_redirects(request.io_redirects().clone())
        .timeout(request.timeout())
        .build()
}

fn maven_set_versions(executable: &str, request: &BuildRequest) -> Result<(), BuildError> {
    let arguments = vec![
        "versions:set".to_string(),
        format!("-DnewVersion={}", request.src_version()),
        "-DgenerateBackupPoms=false".to_string(),
    ];
    shell::execute(&command(executable, arguments, request))?.assert_success()?;
    Ok(())
}

fn maven_build(executable: &str, request: &BuildRequest) -> Result<(), BuildError> {
    let arguments = merged_build_arguments(
        request,
        MVN_DEFAULT_ARGUMENTS,
        maven_verbosity_arguments(request.verbosity()),
        skip_tests_arguments(request.skip_tests()),
        forward_property_arguments(request.forward_properties()),
    );
    shell::execute(&command(executable, arguments, request))?.assert_success()?;
    Ok(())
}

/// Builds with a `mvn` installed on the machine.
pub struct MvnBuilder {
    executable: String,
}

impl MvnBuilder {
    /// Creates the builder, resolving `mvn` (`mvn.cmd` on Windows) through
    /// `PATH` when possible.
    #[must_use]
    pub fn new() -> Self {
        let name = if cfg!(windows) { "mvn.cmd" } else { "mvn" };
        let executable = which::which(name)
            .map_or_else(|_| name.to_string(), |path| path.display().to_string());
        Self { executable }
    }
}

impl Default for MvnBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder for MvnBuilder {
    fn can_build(&self, project_root_directory: &Path) -> bool {
        has_pom_file(project_root_directory) && !has_mvnw_file(project_root_directory)
    }

    fn set_versions(&self, request: &BuildRequest) -> Result<(), BuildError> {
        maven_set_versions(&self.executable, request)
    }

    fn build(&self, request: &BuildRequest) -> Result<(), BuildError> {
        maven_build(&self.executable, request)
    }
}

/// Builds with the project's own Maven wrapper script.
pub struct MvnwBuilder {
    executable: String,
}

impl MvnwBuilder {
    /// Creates the builder. The wrapper is resolved relative to the
    /// project directory when the command runs.
    #[must_use]
    pub fn new() -> Self {
        let executable = if cfg!(windows) { "mvnw.cmd" } else { "./mvnw" };
        Self {
            executable: executable.to_string(),
        }
    }
}

impl Default for MvnwBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder for MvnwBuilder {
    fn can_build(&self, project_root_directory: &Path) -> bool {
        has_pom_file(project_root_directory) && has_mvnw_file(project_root_directory)
    }

    fn set_versions(&self, request: &BuildRequest) -> Result<(), BuildError> {
        maven_set_versions(&self.executable, request)
    }

    fn build(&self, request: &BuildRequest) -> Result<(), BuildError> {
        maven_build(&self.executable, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_builder_excludes_wrapper_projects() {
        let scratch = tempfile::tempdir().unwrap();
        std::fs::write(scratch.path().join("pom.xml"), b"<project/>").unwrap();

        let mvn = MvnBuilder::new();
        let mvnw = MvnwBuilder::new();
        assert!(mvn.can_build(scratch.path()));
        assert!(!mvnw.can_build(scratch.path()));

        std::fs::write(scratch.path().join("mvnw"), b"#!/bin/sh\n").unwrap();
        assert!(!mvn.can_build(scratch.path()));
        assert!(mvnw.can_build(scratch.path()));
    }

    #[test]
    fn polyglot_pom_names_are_recognized() {
        let scratch = tempfile::tempdir().unwrap();
        assert!(!MvnBuilder::new().can_build(scratch.path()));

        std::fs::write(scratch.path().join("pom.scala"), b"").unwrap();
        assert!(MvnBuilder::new().can_build(scratch.path()));
    }
}
