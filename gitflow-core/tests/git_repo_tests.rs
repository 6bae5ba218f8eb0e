//! GitRepo against real temporary repositories
//!
//! Skipped when no `git` executable is available.

use gitflow_core::branch::Preset;
use gitflow_core::git::{GitRepo, VcsDriver};
use gitflow_core::workflow::{
    FileStateStore, FinishOptions, FinishStep, Orchestrator, StartOptions, StateStore,
};
use gitflow_core::Error;
use std::fs;
use std::path::Path;
use std::process::Command;
use tempfile::TempDir;

fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn git(dir: &Path, args: &[&str]) {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_CONFIG_NOSYSTEM", "1")
        .output()
        .expect("failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
}

fn commit_file(dir: &Path, file: &str, contents: &str, message: &str) {
    fs::write(dir.join(file), contents).unwrap();
    git(dir, &["add", file]);
    git(dir, &["commit", "-q", "-m", message]);
}

/// Repository with main and develop, classic layout written to git config
fn init_repo() -> Option<(TempDir, GitRepo)> {
    if !git_available() {
        eprintln!("git not available, skipping");
        return None;
    }

    let dir = TempDir::new().unwrap();
    let path = dir.path();
    git(path, &["init", "-q"]);
    git(path, &["symbolic-ref", "HEAD", "refs/heads/main"]);
    git(path, &["config", "user.name", "Test User"]);
    git(path, &["config", "user.email", "test@example.com"]);
    git(path, &["config", "commit.gpgsign", "false"]);
    git(path, &["config", "tag.gpgsign", "false"]);
    commit_file(path, "README.md", "hello\n", "Initial commit");
    git(path, &["branch", "develop"]);
    git(path, &["checkout", "-q", "develop"]);

    let repo = GitRepo::open(path).unwrap();
    repo.write_branch_config(&Preset::Classic.hierarchy()).unwrap();
    Some((dir, repo))
}

fn file_on(dir: &Path, branch: &str, file: &str) -> Option<String> {
    let output = Command::new("git")
        .args(["show", &format!("{branch}:{file}")])
        .current_dir(dir)
        .output()
        .unwrap();
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).into_owned())
}

#[test]
fn test_branch_config_round_trip() {
    let Some((_dir, repo)) = init_repo() else {
        return;
    };

    let config = repo.branch_config().unwrap();
    config.validate().unwrap();
    assert_eq!(config.base("develop").unwrap().parent.as_deref(), Some("main"));
    assert_eq!(
        config.branch_type("release").unwrap().start_point.as_deref(),
        Some("develop")
    );
    assert_eq!(repo.configured_remote().unwrap(), None);
}

#[test]
fn test_start_and_finish_feature() {
    let Some((dir, repo)) = init_repo() else {
        return;
    };
    let config = repo.branch_config().unwrap();
    let store = FileStateStore::for_repo(&repo);
    let orch = Orchestrator::new(&config, &repo, &store);

    orch.start("feature", "login", &StartOptions::default())
        .unwrap();
    assert_eq!(repo.current_branch().unwrap().as_deref(), Some("feature/login"));
    commit_file(dir.path(), "login.rs", "fn login() {}\n", "Add login");

    let outcome = orch
        .finish(Some("feature"), Some("log"), &FinishOptions::default())
        .unwrap();

    assert_eq!(outcome.branch, "feature/login");
    assert!(outcome.deleted_local);
    assert!(!repo.branch_exists("feature/login").unwrap());
    assert_eq!(repo.current_branch().unwrap().as_deref(), Some("develop"));
    assert!(file_on(dir.path(), "develop", "login.rs").is_some());
    assert!(!store.in_progress().unwrap());
}

#[test]
fn test_release_tags_and_cascades() {
    let Some((dir, repo)) = init_repo() else {
        return;
    };
    let config = repo.branch_config().unwrap();
    let store = FileStateStore::for_repo(&repo);
    let orch = Orchestrator::new(&config, &repo, &store);

    orch.start("release", "1.0", &StartOptions::default())
        .unwrap();
    commit_file(dir.path(), "VERSION", "1.0\n", "Bump version");

    let outcome = orch
        .finish(Some("release"), Some("1.0"), &FinishOptions::default())
        .unwrap();

    assert_eq!(outcome.tag.as_deref(), Some("v1.0"));
    assert_eq!(outcome.updated_children, vec!["develop"]);
    assert!(repo.tag_exists("v1.0").unwrap());
    assert_eq!(file_on(dir.path(), "main", "VERSION").as_deref(), Some("1.0\n"));
    assert_eq!(file_on(dir.path(), "develop", "VERSION").as_deref(), Some("1.0\n"));
    assert_eq!(file_on(dir.path(), "v1.0", "VERSION").as_deref(), Some("1.0\n"));
}

#[test]
fn test_conflict_persists_record_and_continues() {
    let Some((dir, repo)) = init_repo() else {
        return;
    };
    let config = repo.branch_config().unwrap();
    let store = FileStateStore::for_repo(&repo);
    let orch = Orchestrator::new(&config, &repo, &store);

    orch.start("feature", "readme", &StartOptions::default())
        .unwrap();
    commit_file(dir.path(), "README.md", "feature\n", "Feature readme");
    git(dir.path(), &["checkout", "-q", "develop"]);
    commit_file(dir.path(), "README.md", "develop\n", "Develop readme");

    let err = orch
        .finish(Some("feature"), Some("readme"), &FinishOptions::default())
        .unwrap_err();
    match err {
        Error::MergeConflict { paths, .. } => assert_eq!(paths, vec!["README.md"]),
        other => panic!("expected merge conflict, got {other:?}"),
    }

    assert!(store.path().exists());
    assert!(store.path().starts_with(repo.git_dir()));
    let record = store.load().unwrap().unwrap();
    assert_eq!(record.current_step, FinishStep::Merge);
    assert!(repo.has_unresolved_conflicts().unwrap());

    assert!(matches!(
        orch.continue_finish(None, None),
        Err(Error::UnresolvedConflicts)
    ));

    fs::write(dir.path().join("README.md"), "resolved\n").unwrap();
    git(dir.path(), &["add", "README.md"]);

    orch.continue_finish(Some("feature"), Some("readme")).unwrap();

    assert_eq!(
        file_on(dir.path(), "develop", "README.md").as_deref(),
        Some("resolved\n")
    );
    assert!(!repo.branch_exists("feature/readme").unwrap());
    assert!(!store.in_progress().unwrap());
}

#[test]
fn test_abort_restores_topic_branch() {
    let Some((dir, repo)) = init_repo() else {
        return;
    };
    let config = repo.branch_config().unwrap();
    let store = FileStateStore::for_repo(&repo);
    let orch = Orchestrator::new(&config, &repo, &store);

    orch.start("feature", "readme", &StartOptions::default())
        .unwrap();
    commit_file(dir.path(), "README.md", "feature\n", "Feature readme");
    git(dir.path(), &["checkout", "-q", "develop"]);
    commit_file(dir.path(), "README.md", "develop\n", "Develop readme");

    orch.finish(Some("feature"), Some("readme"), &FinishOptions::default())
        .unwrap_err();

    orch.abort_finish(None, None).unwrap();

    assert!(!repo.has_unresolved_conflicts().unwrap());
    assert_eq!(repo.current_branch().unwrap().as_deref(), Some("feature/readme"));
    assert_eq!(
        fs::read_to_string(dir.path().join("README.md")).unwrap(),
        "feature\n"
    );
    assert_eq!(
        file_on(dir.path(), "develop", "README.md").as_deref(),
        Some("develop\n")
    );
    assert!(!store.in_progress().unwrap());
    assert!(matches!(
        orch.abort_finish(None, None),
        Err(Error::NoOperationInProgress)
    ));
}

#[test]
fn test_delete_unmerged_branch_needs_force() {
    let Some((dir, repo)) = init_repo() else {
        return;
    };

    repo.create_branch("feature/spike", "develop").unwrap();
    repo.checkout("feature/spike").unwrap();
    commit_file(dir.path(), "spike.txt", "spike\n", "Spike");
    repo.checkout("develop").unwrap();

    assert!(matches!(
        repo.delete_branch("feature/spike", false),
        Err(Error::UnmergedChanges(_))
    ));
    repo.delete_branch("feature/spike", true).unwrap();
    assert!(!repo.branch_exists("feature/spike").unwrap());
    assert!(matches!(
        repo.create_branch("develop", "main"),
        Err(Error::BranchExists(_))
    ));
}
