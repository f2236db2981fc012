//! The Git implementation of [`Scm`], backed by libgit2.
//!
//! A workspace that does not yet contain a valid repository is initialized
//! and populated from scratch; a warm workspace is fetched and hard-reset
//! instead, so repeated builds of the same project reuse the object store.
//! Every URL a workspace has ever been synced against is registered under
//! its own remote alias (`origin`, `origin1`, …) and every fetch lands in
//! that alias's ref namespace, so a requested ref or commit counts as found
//! only when *this* URL actually advertised it.

use std::path::Path;

use git2::build::CheckoutBuilder;
use git2::{AutotagOption, FetchOptions, FetchPrune, Oid, Repository, ResetType};

use crate::request::BuildRequest;
use crate::version::WellKnownType;

use super::{Scm, ScmError};

/// The URL scheme prefix claimed by [`GitScm`].
pub const SCM_GIT_PREFIX: &str = "git:";

/// The dedicated local branch all checkouts end up on. Keeping builds off
/// the remote branch names avoids clashes when the same workspace is
/// re-synced against different URLs.
const WORK_BRANCH: &str = "depforge-work";

/// A Git [`Scm`] implementation.
#[derive(Debug, Default)]
pub struct GitScm;

impl GitScm {
    /// Creates the implementation.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn checkout_url(
        url: &str,
        dir: &Path,
        kind: WellKnownType,
        wanted: &str,
    ) -> Result<(), ScmError> {
        let repo = match Repository::open(dir) {
            Ok(repo) => repo,
            Err(_) => {
                // Fresh path: whatever is in the directory is not a valid
                // repository; clear it and start over.
                crate::fs::ensure_directory_exists_and_empty(dir).map_err(|source| {
                    ScmError::Workspace {
                        path: dir.to_path_buf(),
                        source,
                    }
                })?;
                Repository::init(dir).map_err(checkout_error(url))?
            }
        };
        Self::sync(&repo, url, kind, wanted)
    }

    /// Fetches `wanted` from `url` into the repository and moves the work
    /// branch and the work tree onto it, discarding local changes.
    fn sync(
        repo: &Repository,
        url: &str,
        kind: WellKnownType,
        wanted: &str,
    ) -> Result<(), ScmError> {
        let git_err = checkout_error(url);

        let alias = remote_alias(repo, url).map_err(&git_err)?;

        let target_ref = match kind {
            WellKnownType::Branch => Some(format!("refs/remotes/{alias}/{wanted}")),
            WellKnownType::Tag => Some(format!("refs/remotes/{alias}/tags/{wanted}")),
            WellKnownType::Revision => None,
        };
        // Drop a stale destination ref from an earlier sync so that its
        // presence after the fetch proves this URL advertised it now.
        if let Some(name) = &target_ref {
            if let Ok(mut stale) = repo.find_reference(name) {
                stale.delete().map_err(&git_err)?;
            }
        }

        let refspecs = match (kind, &target_ref) {
            (WellKnownType::Branch, Some(target)) => {
                vec![format!("+refs/heads/{wanted}:{target}")]
            }
            (WellKnownType::Tag, Some(target)) => vec![format!("+refs/tags/{wanted}:{target}")],
            _ => vec![format!("+refs/heads/*:refs/remotes/{alias}/*")],
        };

        let mut fetch_options = FetchOptions::new();
        fetch_options
            .download_tags(AutotagOption::None)
            .prune(FetchPrune::On);
        repo.find_remote(&alias)
            .and_then(|mut remote| remote.fetch(&refspecs, Some(&mut fetch_options), None))
            .map_err(&git_err)?;

        let commit = resolve_commit(repo, url, &alias, kind, wanted)?;

        // Detach first: a checked-out branch cannot be force-moved.
        repo.set_head_detached(commit.id()).map_err(&git_err)?;
        repo.branch(WORK_BRANCH, &commit, true).map_err(&git_err)?;
        repo.set_head(&format!("refs/heads/{WORK_BRANCH}"))
            .map_err(&git_err)?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force().remove_untracked(true);
        repo.reset(commit.as_object(), ResetType::Hard, Some(&mut checkout))
            .map_err(&git_err)?;
        Ok(())
    }
}

impl Scm for GitScm {
    fn supports(&self, url: &str) -> bool {
        url.starts_with(SCM_GIT_PREFIX)
    }

    fn checkout(&self, request: &BuildRequest) -> Result<(), ScmError> {
        let version = request.src_version();
        let element = version.primary();
        let kind = version
            .well_known_type()
            .map_err(|_| ScmError::UnsupportedVersionType {
                scm: "git",
                version_type: element.version_type().to_string(),
            })?;

        let dir = request.project_root_directory();
        let mut last_error = None;

        for url in request.scm_urls() {
            let url = url.strip_prefix(SCM_GIT_PREFIX).unwrap_or(url);
            tracing::info!("attempting to check out version {version} from SCM URL {url}");
            match Self::checkout_url(url, dir, kind, element.version_value()) {
                Ok(()) => return Ok(()),
                Err(error) => {
                    tracing::warn!(
                        "could not check out version {version} from SCM URL {url}: {error}"
                    );
                    last_error = Some(error);
                }
            }
        }

        // scm_urls is non-empty by BuildRequest construction.
        match last_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn checkout_error(url: &str) -> impl Fn(git2::Error) -> ScmError + '_ {
    move |source| ScmError::Checkout {
        url: url.to_string(),
        source,
    }
}

/// Finds the remote alias registered for `url`, or registers the URL under
/// the first free one of `origin`, `origin1`, `origin2`, ….
fn remote_alias(repo: &Repository, url: &str) -> Result<String, git2::Error> {
    let remotes = repo.remotes()?;
    for name in remotes.iter().flatten() {
        if let Ok(remote) = repo.find_remote(name) {
            if remote.url() == Some(url) {
                return Ok(name.to_string());
            }
        }
    }

    let taken: Vec<&str> = remotes.iter().flatten().collect();
    let mut index = 0usize;
    loop {
        let candidate = if index == 0 {
            "origin".to_string()
        } else {
            format!("origin{index}")
        };
        if !taken.contains(&candidate.as_str()) {
            repo.remote(&candidate, url)?;
            return Ok(candidate);
        }
        index += 1;
    }
}

/// Resolves the requested version element to a commit, verifying that the
/// attempted URL actually provided it.
fn resolve_commit<'repo>(
    repo: &'repo Repository,
    url: &str,
    alias: &str,
    kind: WellKnownType,
    wanted: &str,
) -> Result<git2::Commit<'repo>, ScmError> {
    let git_err = checkout_error(url);
    match kind {
        WellKnownType::Branch | WellKnownType::Tag => {
            let name = match kind {
                WellKnownType::Branch => format!("refs/remotes/{alias}/{wanted}"),
                _ => format!("refs/remotes/{alias}/tags/{wanted}"),
            };
            let reference =
                repo.find_reference(&name)
                    .map_err(|_| ScmError::RefNotAdvertised {
                        url: url.to_string(),
                        reference: wanted.to_string(),
                    })?;
            reference.peel_to_commit().map_err(&git_err)
        }
        WellKnownType::Revision => {
            let oid = Oid::from_str(wanted).map_err(|_| ScmError::RevisionNotFound {
                url: url.to_string(),
                revision: wanted.to_string(),
            })?;

            // The commit must be reachable walking back from what this
            // URL's fetch just brought in, not merely present in the
            // object store from some earlier sync.
            let mut walk = repo.revwalk().map_err(&git_err)?;
            walk.push_glob(&format!("refs/remotes/{alias}/*"))
                .map_err(&git_err)?;
            for id in walk {
                if id.map_err(&git_err)? == oid {
                    return repo.find_commit(oid).map_err(&git_err);
                }
            }
            Err(ScmError::RevisionNotFound {
                url: url.to_string(),
                revision: wanted.to_string(),
            })
        }
    }
}
