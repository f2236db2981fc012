//! Checkout behavior of the Git provider against local fixture
//! repositories.

use std::path::Path;

use git2::{BranchType, Commit, Oid, Repository, Signature};

use depforge_core::scm::{GitScm, Scm, ScmError};
use depforge_core::{BuildRequest, SrcVersion};

fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn signature() -> Signature<'static> {
    Signature::now("Depforge Tests", "tests@depforge.invalid").unwrap()
}

fn commit_file(repo: &Repository, name: &str, content: &str, message: &str) -> Oid {
    let workdir = repo.workdir().unwrap();
    std::fs::write(workdir.join(name), content).unwrap();

    let mut index = repo.index().unwrap();
    index.add_path(Path::new(name)).unwrap();
    index.write().unwrap();
    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();

    let signature = signature();
    let parent = repo.head().ok().map(|head| head.peel_to_commit().unwrap());
    let parents: Vec<&Commit> = parent.iter().collect();
    repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message,
        &tree,
        &parents,
    )
    .unwrap()
}

/// A fixture repository: `main` carries two commits; the annotated tag
/// `v1.0` marks the first one.
fn fixture(path: &Path) -> (Repository, Oid) {
    let repo = Repository::init(path).unwrap();

    let tagged = commit_file(&repo, "greeting.txt", "hello at v1.0", "first");
    {
        let commit = repo.find_commit(tagged).unwrap();
        // The default branch name after init depends on host configuration.
        if repo.find_branch("main", BranchType::Local).is_err() {
            repo.branch("main", &commit, false).unwrap();
        }
        repo.set_head("refs/heads/main").unwrap();
        repo.tag(
            "v1.0",
            commit.as_object(),
            &signature(),
            "release v1.0",
            false,
        )
        .unwrap();
    }
    commit_file(&repo, "greeting.txt", "hello fresh", "second");

    (repo, tagged)
}

fn request(urls: &[String], raw_version: &str, workspace: &Path) -> BuildRequest {
    BuildRequest::builder(
        workspace,
        SrcVersion::parse(raw_version).unwrap().unwrap(),
    )
    .scm_urls(urls.iter().cloned())
    .build()
    .unwrap()
}

fn git_url(path: &Path) -> String {
    format!("git:{}", path.display())
}

fn read_greeting(workspace: &Path) -> String {
    std::fs::read_to_string(workspace.join("greeting.txt")).unwrap()
}

#[test]
fn fresh_checkout_of_a_tag() {
    let scratch = tempfile::tempdir().unwrap();
    let upstream = scratch.path().join("upstream");
    let workspace = scratch.path().join("workspace");
    fixture(&upstream);

    GitScm::new()
        .checkout(&request(
            &[git_url(&upstream)],
            "1.0-SRC-tag-v1.0",
            &workspace,
        ))
        .unwrap();

    assert_eq!(read_greeting(&workspace), "hello at v1.0");
    assert!(workspace.join(".git").exists());
}

#[test]
fn fresh_checkout_of_a_branch_tip() {
    let scratch = tempfile::tempdir().unwrap();
    let upstream = scratch.path().join("upstream");
    let workspace = scratch.path().join("workspace");
    fixture(&upstream);

    GitScm::new()
        .checkout(&request(
            &[git_url(&upstream)],
            "1.0-SRC-branch-main",
            &workspace,
        ))
        .unwrap();

    assert_eq!(read_greeting(&workspace), "hello fresh");
}

#[test]
fn fresh_checkout_of_an_exact_revision() {
    let scratch = tempfile::tempdir().unwrap();
    let upstream = scratch.path().join("upstream");
    let workspace = scratch.path().join("workspace");
    let (_repo, tagged) = fixture(&upstream);

    GitScm::new()
        .checkout(&request(
            &[git_url(&upstream)],
            &format!("1.0-SRC-revision-{tagged}"),
            &workspace,
        ))
        .unwrap();

    assert_eq!(read_greeting(&workspace), "hello at v1.0");
}

#[test]
fn warm_workspace_is_fetched_and_reset_not_recloned() {
    init_logging();
    let scratch = tempfile::tempdir().unwrap();
    let upstream = scratch.path().join("upstream");
    let workspace = scratch.path().join("workspace");
    let (repo, _) = fixture(&upstream);

    let scm = GitScm::new();
    let branch_request = request(&[git_url(&upstream)], "1.0-SRC-branch-main", &workspace);
    scm.checkout(&branch_request).unwrap();
    assert_eq!(read_greeting(&workspace), "hello fresh");

    // Dirty the workspace: local edits and untracked droppings must not
    // survive the next sync. The keepsake under .git proves the
    // repository itself was reused rather than deleted and re-cloned.
    std::fs::write(workspace.join("greeting.txt"), "local tampering").unwrap();
    std::fs::write(workspace.join("droppings.txt"), "untracked").unwrap();
    let keepsake = workspace.join(".git").join("depforge-keepsake");
    std::fs::write(&keepsake, b"still here").unwrap();

    commit_file(&repo, "greeting.txt", "hello again", "third");

    scm.checkout(&branch_request).unwrap();
    assert_eq!(read_greeting(&workspace), "hello again");
    assert!(
        !workspace.join("droppings.txt").exists(),
        "untracked files must be cleaned"
    );
    assert!(keepsake.exists(), "repository must be reused, not re-cloned");
}

#[test]
fn second_url_is_tried_after_a_dead_first_one() {
    init_logging();
    let scratch = tempfile::tempdir().unwrap();
    let upstream = scratch.path().join("upstream");
    let workspace = scratch.path().join("workspace");
    fixture(&upstream);

    let dead = git_url(&scratch.path().join("no-such-repo"));
    GitScm::new()
        .checkout(&request(
            &[dead, git_url(&upstream)],
            "1.0-SRC-tag-v1.0",
            &workspace,
        ))
        .unwrap();

    assert_eq!(read_greeting(&workspace), "hello at v1.0");
}

#[test]
fn total_failure_surfaces_the_last_urls_error() {
    let scratch = tempfile::tempdir().unwrap();
    let first = scratch.path().join("first-upstream");
    let second = scratch.path().join("second-upstream");
    let workspace = scratch.path().join("workspace");
    fixture(&first);
    fixture(&second);

    // Neither upstream has the tag; the surfaced error must speak about
    // the *last* URL tried.
    let outcome = GitScm::new().checkout(&request(
        &[git_url(&first), git_url(&second)],
        "9.9-SRC-tag-v9.9",
        &workspace,
    ));

    match outcome {
        Err(ScmError::RefNotAdvertised { url, reference }) => {
            assert_eq!(reference, "v9.9");
            assert_eq!(url, second.display().to_string());
        }
        Err(ScmError::Checkout { url, .. }) => {
            assert_eq!(url, second.display().to_string());
        }
        other => panic!("expected the last URL's error, got {other:?}"),
    }
}

#[test]
fn unfetched_revision_is_not_silently_reused() {
    let scratch = tempfile::tempdir().unwrap();
    let upstream = scratch.path().join("upstream");
    let workspace = scratch.path().join("workspace");
    fixture(&upstream);

    let bogus = "deadbeefdeadbeefdeadbeefdeadbeefdeadbeef";
    let outcome = GitScm::new().checkout(&request(
        &[git_url(&upstream)],
        &format!("1.0-SRC-revision-{bogus}"),
        &workspace,
    ));
    assert!(matches!(
        outcome,
        Err(ScmError::RevisionNotFound { revision, .. }) if revision == bogus
    ));
}

#[test]
fn each_url_gets_its_own_remote_alias() {
    let scratch = tempfile::tempdir().unwrap();
    let first = scratch.path().join("first-upstream");
    let second = scratch.path().join("second-upstream");
    let workspace = scratch.path().join("workspace");
    fixture(&first);
    fixture(&second);

    let scm = GitScm::new();
    scm.checkout(&request(&[git_url(&first)], "1.0-SRC-tag-v1.0", &workspace))
        .unwrap();
    scm.checkout(&request(
        &[git_url(&second)],
        "1.0-SRC-branch-main",
        &workspace,
    ))
    .unwrap();

    let repo = Repository::open(&workspace).unwrap();
    let remotes = repo.remotes().unwrap();
    let names: Vec<&str> = remotes.iter().flatten().collect();
    assert!(names.contains(&"origin"), "remotes: {names:?}");
    assert!(names.contains(&"origin1"), "remotes: {names:?}");
}

#[test]
fn unsupported_version_type_is_rejected_before_any_url() {
    let scratch = tempfile::tempdir().unwrap();
    let workspace = scratch.path().join("workspace");

    let outcome = GitScm::new().checkout(&request(
        &["git:/nowhere".to_string()],
        "1.0-SRC-gerrit-refs/changes/1",
        &workspace,
    ));
    assert!(matches!(
        outcome,
        Err(ScmError::UnsupportedVersionType { scm: "git", .. })
    ));
    assert!(!workspace.exists(), "no URL may be touched for a bad type");
}
