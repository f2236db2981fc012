//! Synchronous execution of external commands.
//!
//! [`execute`] is the single place in this crate where an OS process is
//! created. A [`ShellCommand`] describes what to run (executable, arguments,
//! working directory, environment overlay, I/O redirection, timeout); the
//! result is the child's exit code or a typed failure.

mod command;
mod process;
mod redirect;

pub use command::{ShellCommand, ShellCommandBuilder};
pub use process::{execute, CommandResult, ShellError};
pub use redirect::{IoRedirects, Redirect, RedirectParseError};
