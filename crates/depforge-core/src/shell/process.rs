//! Spawning and supervising the child process.

use std::fs::{File, OpenOptions};
use std::io;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;

use super::command::ShellCommand;
use super::redirect::Redirect;

/// The liveness poll granularity while waiting for the child to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Errors raised while executing a [`ShellCommand`].
#[derive(Debug, Error)]
pub enum ShellError {
    /// The process could not be spawned, or a redirect target could not be
    /// opened.
    #[error("could not start command [{command_line}]: {source}")]
    CannotStart {
        /// The command line that failed to start.
        command_line: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Polling the child's liveness failed.
    #[error("could not monitor command [{command_line}]: {source}")]
    WaitFailed {
        /// The command line being monitored.
        command_line: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The child outlived its timeout and was terminated.
    #[error("command has not finished within {timeout_ms} ms: [{command_line}]")]
    Timeout {
        /// The command line that timed out.
        command_line: String,
        /// The configured limit, in milliseconds.
        timeout_ms: u128,
    },

    /// The child exited with a non-zero code.
    #[error("command [{command_line}] returned exit code {exit_code}")]
    BadExitCode {
        /// The command line that failed.
        command_line: String,
        /// The non-zero exit code (`-1` when killed by a signal).
        exit_code: i32,
    },
}

/// The outcome of a finished command.
#[derive(Debug, Clone)]
pub struct CommandResult {
    command_line: String,
    exit_code: i32,
}

impl CommandResult {
    /// The child's exit code; `-1` when it was killed by a signal.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }

    /// Maps a non-zero exit code to [`ShellError::BadExitCode`].
    ///
    /// # Errors
    ///
    /// [`ShellError::BadExitCode`] if and only if the exit code is non-zero.
    pub fn assert_success(self) -> Result<Self, ShellError> {
        if self.exit_code == 0 {
            Ok(self)
        } else {
            Err(ShellError::BadExitCode {
                command_line: self.command_line,
                exit_code: self.exit_code,
            })
        }
    }
}

/// Kills the child on every exit path that did not observe it finishing, so
/// a panicking or erroring caller never leaks a running build.
struct ChildGuard {
    child: Child,
    armed: bool,
}

impl ChildGuard {
    fn kill_and_reap(&mut self) {
        self.armed = false;
        if let Err(error) = self.child.kill() {
            tracing::warn!("could not kill child process: {error}");
        }
        if let Err(error) = self.child.wait() {
            tracing::warn!("could not reap child process: {error}");
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if self.armed {
            self.kill_and_reap();
        }
    }
}

/// Executes the given command synchronously.
///
/// The child inherits the current process's environment with the command's
/// overlay applied on top. Liveness is polled at most every 100ms until the
/// command's timeout, after which the child is killed.
///
/// # Errors
///
/// [`ShellError::CannotStart`] if the process cannot be spawned,
/// [`ShellError::Timeout`] if it does not finish in time. The returned
/// [`CommandResult`] carries the exit code; use
/// [`CommandResult::assert_success`] to turn a non-zero code into
/// [`ShellError::BadExitCode`].
pub fn execute(command: &ShellCommand) -> Result<CommandResult, ShellError> {
    let command_line = command.command_line();
    tracing::info!("about to execute command [{command_line}]");

    let cannot_start = |source: io::Error| ShellError::CannotStart {
        command_line: command_line.clone(),
        source,
    };

    let redirects = command.io_redirects();
    let stdin = open_stdio(redirects.stdin()).map_err(cannot_start)?;

    // Keep the stdout file handle around: when stderr is merged into
    // stdout, stderr gets a duplicate of the very same handle so that the
    // two streams interleave in one file.
    let (stdout, stdout_file) = open_stdout(redirects.stdout()).map_err(cannot_start)?;
    let stderr = match (redirects.stderr(), stdout_file) {
        (Some(redirect), _) => open_stdio(redirect).map_err(cannot_start)?,
        (None, Some(file)) => file.try_clone().map_err(cannot_start)?.into(),
        (None, None) => Stdio::inherit(),
    };

    let child = Command::new(command.executable())
        .args(command.arguments())
        .current_dir(command.working_directory())
        .envs(command.environment())
        .stdin(stdin)
        .stdout(stdout)
        .stderr(stderr)
        .spawn()
        .map_err(cannot_start)?;

    wait_with_timeout(child, command.timeout(), command_line)
}

fn open_stdio(redirect: &Redirect) -> io::Result<Stdio> {
    match redirect {
        Redirect::Inherit => Ok(Stdio::inherit()),
        Redirect::Read(path) => File::open(path).map(Stdio::from),
        Redirect::Write(path) => File::create(path).map(Stdio::from),
        Redirect::Append(path) => OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map(Stdio::from),
    }
}

fn open_stdout(redirect: &Redirect) -> io::Result<(Stdio, Option<File>)> {
    match redirect {
        Redirect::Write(path) => {
            let file = File::create(path)?;
            Ok((file.try_clone()?.into(), Some(file)))
        }
        Redirect::Append(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Ok((file.try_clone()?.into(), Some(file)))
        }
        other => Ok((open_stdio(other)?, None)),
    }
}

fn wait_with_timeout(
    child: Child,
    timeout: Duration,
    command_line: String,
) -> Result<CommandResult, ShellError> {
    let started = Instant::now();
    let mut guard = ChildGuard { child, armed: true };

    loop {
        match guard.child.try_wait() {
            Ok(Some(status)) => {
                guard.armed = false;
                let exit_code = status.code().unwrap_or(-1);
                tracing::debug!("command [{command_line}] exited with code {exit_code}");
                return Ok(CommandResult {
                    command_line,
                    exit_code,
                });
            }
            Ok(None) => {
                let elapsed = started.elapsed();
                if elapsed >= timeout {
                    guard.kill_and_reap();
                    return Err(ShellError::Timeout {
                        command_line,
                        timeout_ms: timeout.as_millis(),
                    });
                }
                thread::sleep((timeout - elapsed).min(POLL_INTERVAL));
            }
            Err(source) => {
                guard.kill_and_reap();
                return Err(ShellError::WaitFailed {
                    command_line,
                    source,
                });
            }
        }
    }
}
