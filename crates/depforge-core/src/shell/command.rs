//! Definition of a single external command.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::redirect::IoRedirects;

/// The default timeout for a command: 5 minutes.
pub(crate) const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// A definition of an external command executable via
/// [`execute`](super::execute).
///
/// The environment map is an overlay: the spawned process inherits the
/// current process's environment and only the entries listed here are added
/// or overwritten.
#[derive(Debug, Clone)]
pub struct ShellCommand {
    executable: String,
    arguments: Vec<String>,
    working_directory: PathBuf,
    environment: HashMap<String, String>,
    io_redirects: IoRedirects,
    timeout: Duration,
}

impl ShellCommand {
    /// Starts building a command. The executable and the working directory
    /// are the only two fields without a usable default.
    #[must_use]
    pub fn builder(
        executable: impl Into<String>,
        working_directory: impl Into<PathBuf>,
    ) -> ShellCommandBuilder {
        ShellCommandBuilder {
            executable: executable.into(),
            arguments: Vec::new(),
            working_directory: working_directory.into(),
            environment: HashMap::new(),
            io_redirects: IoRedirects::inherit_all(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// The executable to run.
    #[must_use]
    pub fn executable(&self) -> &str {
        &self.executable
    }

    /// The arguments passed to the executable.
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// The directory the command runs in.
    #[must_use]
    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    /// The environment overlay entries.
    #[must_use]
    pub fn environment(&self) -> &HashMap<String, String> {
        &self.environment
    }

    /// The I/O redirection triple.
    #[must_use]
    pub fn io_redirects(&self) -> &IoRedirects {
        &self.io_redirects
    }

    /// The hard wall-clock limit for the command.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The executable and its arguments as one diagnostic string.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut line = self.executable.clone();
        for argument in &self.arguments {
            line.push(' ');
            line.push_str(argument);
        }
        line
    }
}

/// Builder for [`ShellCommand`].
#[derive(Debug, Clone)]
pub struct ShellCommandBuilder {
    executable: String,
    arguments: Vec<String>,
    working_directory: PathBuf,
    environment: HashMap<String, String>,
    io_redirects: IoRedirects,
    timeout: Duration,
}

impl ShellCommandBuilder {
    /// Appends one argument.
    #[must_use]
    pub fn argument(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Appends all given arguments.
    #[must_use]
    pub fn arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(arguments.into_iter().map(Into::into));
        self
    }

    /// Adds all given entries to the environment overlay.
    #[must_use]
    pub fn environment(mut self, environment: &HashMap<String, String>) -> Self {
        self.environment
            .extend(environment.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    /// Adds one entry to the environment overlay.
    #[must_use]
    pub fn environment_variable(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.environment.insert(name.into(), value.into());
        self
    }

    /// Sets the I/O redirection triple.
    #[must_use]
    pub fn io_redirects(mut self, io_redirects: IoRedirects) -> Self {
        self.io_redirects = io_redirects;
        self
    }

    /// Sets the wall-clock limit.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Finishes the build.
    #[must_use]
    pub fn build(self) -> ShellCommand {
        ShellCommand {
            executable: self.executable,
            arguments: self.arguments,
            working_directory: self.working_directory,
            environment: self.environment,
            io_redirects: self.io_redirects,
            timeout: self.timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_joins_executable_and_arguments() {
        let command = ShellCommand::builder("mvn", "/tmp/project")
            .arguments(["clean", "install"])
            .build();
        assert_eq!(command.command_line(), "mvn clean install");
    }

    #[test]
    fn builder_defaults() {
        let command = ShellCommand::builder("true", "/tmp").build();
        assert_eq!(command.timeout(), DEFAULT_TIMEOUT);
        assert!(command.environment().is_empty());
        assert!(!command.io_redirects().is_err2out());
    }
}
