//! I/O redirection for spawned commands.
//!
//! Each of stdin/stdout/stderr is redirected independently. The
//! configuration boundary hands redirects over as URI strings with the
//! grammar `<scheme>[:<path>]` where the scheme is one of `read`, `write`,
//! `append`, `inherit` and `err2out`; `inherit` and `err2out` take no path,
//! the others require one. Bad URIs are rejected here, at configuration
//! parse time, not when the build runs.

use std::path::PathBuf;
use std::str::FromStr;

use thiserror::Error;

/// Errors raised when parsing a redirect URI.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RedirectParseError {
    /// The URI starts with a colon, so the scheme is empty.
    #[error("colon found at position 0 of redirect URI '{uri}'")]
    LeadingColon {
        /// The offending URI.
        uri: String,
    },

    /// The scheme is not one of the supported ones.
    #[error(
        "unknown scheme '{scheme}' in redirect URI '{uri}'; only 'read', 'write', 'append' \
         and 'inherit' are supported, plus 'err2out' for the error stream"
    )]
    UnknownScheme {
        /// The offending URI.
        uri: String,
        /// The unrecognized scheme.
        scheme: String,
    },

    /// A path-taking scheme came without a path.
    #[error("scheme '{scheme}' requires a path, but none was given in redirect URI '{uri}'")]
    MissingPath {
        /// The offending URI.
        uri: String,
        /// The scheme that wanted a path.
        scheme: String,
    },

    /// A pathless scheme came with trailing characters.
    #[error("unexpected characters after '{scheme}' in redirect URI '{uri}'")]
    UnexpectedPath {
        /// The offending URI.
        uri: String,
        /// The scheme that takes no path.
        scheme: String,
    },

    /// `err2out` was used for a stream other than stderr.
    #[error("'err2out' is only valid for the error stream, not in redirect URI '{uri}'")]
    Err2OutMisplaced {
        /// The offending URI.
        uri: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
enum RedirectScheme {
    Append,
    Err2Out,
    Inherit,
    Read,
    Write,
}

/// Where one standard stream of a spawned command goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Redirect {
    /// Share the parent process's stream.
    Inherit,
    /// Read the stream from the given file.
    Read(PathBuf),
    /// Write the stream to the given file, truncating it first.
    Write(PathBuf),
    /// Append the stream to the given file.
    Append(PathBuf),
}

impl Redirect {
    /// Parses a redirect URI.
    ///
    /// Returns `Ok(None)` for `err2out`, which stands for "merge stderr
    /// into stdout" and is representable only as the absent stderr slot of
    /// an [`IoRedirects`].
    ///
    /// # Errors
    ///
    /// [`RedirectParseError`] on an unknown scheme, a missing or unexpected
    /// path, or an empty scheme.
    pub fn parse_uri(uri: &str) -> Result<Option<Self>, RedirectParseError> {
        let (scheme_str, path) = match uri.find(':') {
            Some(0) => {
                return Err(RedirectParseError::LeadingColon {
                    uri: uri.to_string(),
                })
            }
            Some(pos) => (&uri[..pos], Some(&uri[pos + 1..])),
            None => (uri, None),
        };

        let scheme = RedirectScheme::from_str(&scheme_str.to_ascii_lowercase()).map_err(|_| {
            RedirectParseError::UnknownScheme {
                uri: uri.to_string(),
                scheme: scheme_str.to_string(),
            }
        })?;

        let require_path = || {
            path.filter(|p| !p.is_empty())
                .map(PathBuf::from)
                .ok_or_else(|| RedirectParseError::MissingPath {
                    uri: uri.to_string(),
                    scheme: scheme_str.to_ascii_lowercase(),
                })
        };
        let forbid_path = || match path {
            Some(_) => Err(RedirectParseError::UnexpectedPath {
                uri: uri.to_string(),
                scheme: scheme_str.to_ascii_lowercase(),
            }),
            None => Ok(()),
        };

        match scheme {
            RedirectScheme::Read => Ok(Some(Self::Read(require_path()?))),
            RedirectScheme::Write => Ok(Some(Self::Write(require_path()?))),
            RedirectScheme::Append => Ok(Some(Self::Append(require_path()?))),
            RedirectScheme::Inherit => {
                forbid_path()?;
                Ok(Some(Self::Inherit))
            }
            RedirectScheme::Err2Out => {
                forbid_path()?;
                Ok(None)
            }
        }
    }
}

/// The redirect triple of a spawned command.
///
/// `stderr` being `None` means stderr is merged into whatever stdout is
/// redirected to; by construction this is mutually exclusive with an
/// explicit stderr target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoRedirects {
    stdin: Redirect,
    stdout: Redirect,
    stderr: Option<Redirect>,
}

impl IoRedirects {
    /// All three streams shared with the parent process.
    #[must_use]
    pub fn inherit_all() -> Self {
        Self {
            stdin: Redirect::Inherit,
            stdout: Redirect::Inherit,
            stderr: Some(Redirect::Inherit),
        }
    }

    /// Builds the triple from already-parsed redirects; `stderr = None`
    /// merges stderr into stdout.
    #[must_use]
    pub fn new(stdin: Redirect, stdout: Redirect, stderr: Option<Redirect>) -> Self {
        Self {
            stdin,
            stdout,
            stderr,
        }
    }

    /// Builds the triple from three redirect URIs, as handed over by the
    /// configuration boundary.
    ///
    /// # Errors
    ///
    /// [`RedirectParseError`] if any URI is bad, or if `err2out` is used
    /// for stdin or stdout.
    pub fn parse_uris(
        stdin: &str,
        stdout: &str,
        stderr: &str,
    ) -> Result<Self, RedirectParseError> {
        let parse_stream = |uri: &str| {
            Redirect::parse_uri(uri)?.ok_or_else(|| RedirectParseError::Err2OutMisplaced {
                uri: uri.to_string(),
            })
        };
        Ok(Self {
            stdin: parse_stream(stdin)?,
            stdout: parse_stream(stdout)?,
            stderr: Redirect::parse_uri(stderr)?,
        })
    }

    /// The stdin redirect.
    #[must_use]
    pub fn stdin(&self) -> &Redirect {
        &self.stdin
    }

    /// The stdout redirect.
    #[must_use]
    pub fn stdout(&self) -> &Redirect {
        &self.stdout
    }

    /// The stderr redirect; `None` means merged into stdout.
    #[must_use]
    pub fn stderr(&self) -> Option<&Redirect> {
        self.stderr.as_ref()
    }

    /// Whether stderr is merged into stdout.
    #[must_use]
    pub fn is_err2out(&self) -> bool {
        self.stderr.is_none()
    }
}

impl Default for IoRedirects {
    fn default() -> Self {
        Self::inherit_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_path_schemes() {
        assert_eq!(
            Redirect::parse_uri("read:/tmp/in.txt").unwrap(),
            Some(Redirect::Read(PathBuf::from("/tmp/in.txt")))
        );
        assert_eq!(
            Redirect::parse_uri("write:/tmp/out.log").unwrap(),
            Some(Redirect::Write(PathBuf::from("/tmp/out.log")))
        );
        assert_eq!(
            Redirect::parse_uri("append:/tmp/out.log").unwrap(),
            Some(Redirect::Append(PathBuf::from("/tmp/out.log")))
        );
    }

    #[test]
    fn parses_pathless_schemes() {
        assert_eq!(
            Redirect::parse_uri("inherit").unwrap(),
            Some(Redirect::Inherit)
        );
        assert_eq!(Redirect::parse_uri("err2out").unwrap(), None);
        // Scheme matching is case-insensitive.
        assert_eq!(Redirect::parse_uri("ERR2OUT").unwrap(), None);
    }

    #[test]
    fn rejects_path_after_pathless_scheme() {
        assert!(matches!(
            Redirect::parse_uri("inherit:/tmp/x"),
            Err(RedirectParseError::UnexpectedPath { .. })
        ));
        assert!(matches!(
            Redirect::parse_uri("err2out:/tmp/x"),
            Err(RedirectParseError::UnexpectedPath { .. })
        ));
    }

    #[test]
    fn rejects_missing_path() {
        assert!(matches!(
            Redirect::parse_uri("read"),
            Err(RedirectParseError::MissingPath { .. })
        ));
        assert!(matches!(
            Redirect::parse_uri("write:"),
            Err(RedirectParseError::MissingPath { .. })
        ));
    }

    #[test]
    fn rejects_unknown_scheme_and_leading_colon() {
        assert!(matches!(
            Redirect::parse_uri("pipe:/tmp/x"),
            Err(RedirectParseError::UnknownScheme { .. })
        ));
        assert!(matches!(
            Redirect::parse_uri(":/tmp/x"),
            Err(RedirectParseError::LeadingColon { .. })
        ));
    }

    #[test]
    fn err2out_rejected_outside_stderr() {
        assert!(matches!(
            IoRedirects::parse_uris("err2out", "inherit", "inherit"),
            Err(RedirectParseError::Err2OutMisplaced { .. })
        ));
        let redirects = IoRedirects::parse_uris("inherit", "write:/tmp/b.log", "err2out").unwrap();
        assert!(redirects.is_err2out());
        assert_eq!(
            redirects.stdout(),
            &Redirect::Write(PathBuf::from("/tmp/b.log"))
        );
    }
}
