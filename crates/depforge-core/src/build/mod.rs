//! Build tool invocation.
//!
//! A [`Builder`] announces which project directories it can handle via
//! [`Builder::can_build`] (typically by the presence of the tool's build
//! descriptor and the absence of a wrapper script that would imply a
//! different variant), rewrites the checked-out project's declared version,
//! and drives the actual build through [`crate::shell`].

use std::path::Path;

use crate::error::BuildError;
use crate::request::{BuildRequest, Verbosity};

mod maven;

pub use maven::{MvnBuilder, MvnwBuilder};

/// One build tool implementation.
pub trait Builder: Send + Sync {
    /// Whether this builder can build the given project directory.
    fn can_build(&self, project_root_directory: &Path) -> bool;

    /// Rewrites the project's declared version to the request's source
    /// version, so the artifact the build installs carries the version the
    /// depending project asked for.
    ///
    /// # Errors
    ///
    /// Any failure of the spawned version-set command.
    fn set_versions(&self, request: &BuildRequest) -> Result<(), BuildError>;

    /// Runs the build.
    ///
    /// # Errors
    ///
    /// Any failure of the spawned build command; a non-zero exit is fatal.
    fn build(&self, request: &BuildRequest) -> Result<(), BuildError>;
}

/// Merges the argument groups in their fixed order: tool defaults (only
/// when the request opts in), the request's explicit arguments, verbosity
/// flags, skip-tests flags, forwarded-property flags.
#[must_use]
pub fn merged_build_arguments(
    request: &BuildRequest,
    default_arguments: &[&str],
    verbosity_arguments: &[&str],
    skip_tests_arguments: &[&str],
    forward_property_arguments: Vec<String>,
) -> Vec<String> {
    let mut result = Vec::new();
    if request.add_default_build_arguments() {
        result.extend(default_arguments.iter().map(ToString::to_string));
    }
    result.extend(request.build_arguments().iter().cloned());
    result.extend(verbosity_arguments.iter().map(ToString::to_string));
    result.extend(skip_tests_arguments.iter().map(ToString::to_string));
    result.extend(forward_property_arguments);
    result
}

/// Renders the `-D<name>=<value>` flags for the request's forwarded
/// properties, expanding trailing-`*` names as prefixes against the current
/// process environment, plus a summary flag naming what was forwarded.
#[must_use]
pub fn forward_property_arguments(forward_properties: &[String]) -> Vec<String> {
    if forward_properties.is_empty() {
        return Vec::new();
    }

    let mut result = Vec::new();
    let mut names = String::new();
    for name in forward_properties {
        if !names.is_empty() {
            names.push(',');
        }
        names.push_str(name);

        if let Some(prefix) = name.strip_suffix('*') {
            let mut matching: Vec<(String, String)> = std::env::vars()
                .filter(|(key, _)| key.starts_with(prefix))
                .collect();
            matching.sort();
            result.extend(
                matching
                    .into_iter()
                    .map(|(key, value)| format!("-D{key}={value}")),
            );
        } else if let Ok(value) = std::env::var(name) {
            result.push(format!("-D{name}={value}"));
        }
    }

    result.push(format!("-Ddepforge.forwardProperties={names}"));
    result
}

/// The verbosity flag mapping shared by the Maven-style builders.
fn maven_verbosity_arguments(verbosity: Verbosity) -> &'static [&'static str] {
    match verbosity {
        Verbosity::Trace | Verbosity::Debug => &["--debug"],
        Verbosity::Info => &[],
        Verbosity::Warn | Verbosity::Error => &["--quiet"],
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::version::SrcVersion;

    fn request(add_defaults: bool) -> BuildRequest {
        BuildRequest::builder(
            "/tmp/project",
            SrcVersion::parse("1.0-SRC-tag-v1.0").unwrap().unwrap(),
        )
        .scm_url("git:https://example.org/acme.git")
        .build_argument("-Dmaven.repo.local=/tmp/repo")
        .add_default_build_arguments(add_defaults)
        .build()
        .unwrap()
    }

    #[test]
    fn merge_keeps_group_order() {
        let args = merged_build_arguments(
            &request(true),
            &["clean", "install"],
            &["--quiet"],
            &["-DskipTests"],
            vec!["-Dacme.mirror=x".to_string()],
        );
        assert_eq!(
            args,
            vec![
                "clean",
                "install",
                "-Dmaven.repo.local=/tmp/repo",
                "--quiet",
                "-DskipTests",
                "-Dacme.mirror=x",
            ]
        );
    }

    #[test]
    fn merge_can_leave_defaults_out() {
        let args = merged_build_arguments(&request(false), &["clean", "install"], &[], &[], vec![]);
        assert_eq!(args, vec!["-Dmaven.repo.local=/tmp/repo"]);
    }

    #[test]
    #[serial]
    fn forwards_exact_and_prefixed_names() {
        std::env::set_var("DEPFORGE_TEST_SETTINGS", "/tmp/settings.xml");
        std::env::set_var("DEPFORGE_TEST_PREFIXED_A", "1");
        std::env::set_var("DEPFORGE_TEST_PREFIXED_B", "2");

        let args = forward_property_arguments(&[
            "DEPFORGE_TEST_SETTINGS".to_string(),
            "DEPFORGE_TEST_PREFIXED_*".to_string(),
            "DEPFORGE_TEST_UNSET".to_string(),
        ]);

        assert_eq!(
            args,
            vec![
                "-DDEPFORGE_TEST_SETTINGS=/tmp/settings.xml",
                "-DDEPFORGE_TEST_PREFIXED_A=1",
                "-DDEPFORGE_TEST_PREFIXED_B=2",
                "-Ddepforge.forwardProperties=DEPFORGE_TEST_SETTINGS,DEPFORGE_TEST_PREFIXED_*,DEPFORGE_TEST_UNSET",
            ]
        );

        std::env::remove_var("DEPFORGE_TEST_SETTINGS");
        std::env::remove_var("DEPFORGE_TEST_PREFIXED_A");
        std::env::remove_var("DEPFORGE_TEST_PREFIXED_B");
    }

    #[test]
    #[serial]
    fn no_forwarded_names_means_no_flags() {
        assert!(forward_property_arguments(&[]).is_empty());
    }

    #[test]
    fn maven_verbosity_flag_mapping() {
        assert_eq!(maven_verbosity_arguments(Verbosity::Trace), ["--debug"]);
        assert_eq!(maven_verbosity_arguments(Verbosity::Debug), ["--debug"]);
        assert!(maven_verbosity_arguments(Verbosity::Info).is_empty());
        assert_eq!(maven_verbosity_arguments(Verbosity::Warn), ["--quiet"]);
        assert_eq!(maven_verbosity_arguments(Verbosity::Error), ["--quiet"]);
    }
}
