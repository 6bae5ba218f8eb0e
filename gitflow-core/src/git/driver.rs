//! `VcsDriver` implementation backed by the `git` executable

use std::process::{Command, Output};

use git2::RepositoryState;

use super::repo::GitRepo;
use super::{IntegrationOutcome, VcsDriver};
use crate::{Error, Result};

impl GitRepo {
    /// Run `git` in the working tree with a non-interactive environment
    fn git(&self, args: &[&str]) -> Result<Output> {
        tracing::debug!(args = ?args, "Running git");

        Command::new("git")
            .args(args)
            .current_dir(self.root())
            .env("GIT_EDITOR", "true")
            .env("GIT_MERGE_AUTOEDIT", "no")
            .env("LC_ALL", "C")
            .output()
            .map_err(|e| Error::Git(format!("Failed to run git: {}", e)))
    }

    /// Run `git` and map a non-zero exit to `Error::Git`
    fn git_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.git(args)?;
        if !output.status.success() {
            return Err(Error::Git(format!(
                "git {} failed: {}",
                args.join(" "),
                stderr_of(&output)
            )));
        }
        Ok(output)
    }

    /// Interpret a failed merge/rebase: conflicts are an outcome, anything
    /// else an error
    fn integration_result(&self, output: &Output, what: &str) -> Result<IntegrationOutcome> {
        if output.status.success() {
            return Ok(IntegrationOutcome::Clean);
        }

        let paths = self.conflicted_paths()?;
        if !paths.is_empty() {
            tracing::info!(paths = ?paths, "{} stopped on conflicts", what);
            return Ok(IntegrationOutcome::Conflict(paths));
        }

        Err(Error::Git(format!("{} failed: {}", what, stderr_of(output))))
    }
}

fn stderr_of(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr
    }
}

fn is_rebase(state: RepositoryState) -> bool {
    matches!(
        state,
        RepositoryState::Rebase | RepositoryState::RebaseInteractive | RepositoryState::RebaseMerge
    )
}

impl VcsDriver for GitRepo {
    fn checkout(&self, branch: &str) -> Result<()> {
        tracing::info!(branch, "Checking out");
        self.git_checked(&["checkout", "--quiet", branch])?;
        Ok(())
    }

    fn create_branch(&self, name: &str, start_point: &str) -> Result<()> {
        if self.branch_exists(name)? {
            return Err(Error::BranchExists(name.to_string()));
        }
        tracing::info!(branch = name, start_point, "Creating branch");
        self.git_checked(&["branch", "--no-track", name, start_point])?;
        Ok(())
    }

    fn delete_branch(&self, name: &str, force: bool) -> Result<()> {
        tracing::info!(branch = name, force, "Deleting branch");
        let flag = if force { "-D" } else { "-d" };
        let output = self.git(&["branch", flag, name])?;

        if !output.status.success() {
            let stderr = stderr_of(&output);
            if stderr.contains("not fully merged") {
                return Err(Error::UnmergedChanges(name.to_string()));
            }
            if stderr.contains("not found") {
                return Err(Error::BranchNotFound(name.to_string()));
            }
            return Err(Error::Git(format!("Failed to delete {}: {}", name, stderr)));
        }

        Ok(())
    }

    fn merge(&self, branch: &str) -> Result<IntegrationOutcome> {
        tracing::info!(branch, "Merging");
        let output = self.git(&["merge", "--no-ff", "--no-edit", branch])?;
        self.integration_result(&output, "Merge")
    }

    fn fast_forward(&self, branch: &str) -> Result<()> {
        tracing::info!(branch, "Fast-forwarding");
        self.git_checked(&["merge", "--ff-only", branch])?;
        Ok(())
    }

    fn rebase(&self, onto: &str) -> Result<IntegrationOutcome> {
        tracing::info!(onto, "Rebasing");
        let output = self.git(&["rebase", onto])?;
        self.integration_result(&output, "Rebase")
    }

    fn continue_pending(&self) -> Result<IntegrationOutcome> {
        let state = self.pending_state();

        if state == RepositoryState::Merge {
            tracing::info!("Concluding merge");
            self.git_checked(&["commit", "--no-edit"])?;
            return Ok(IntegrationOutcome::Clean);
        }

        if is_rebase(state) {
            tracing::info!("Continuing rebase");
            let output = self.git(&["rebase", "--continue"])?;
            return self.integration_result(&output, "Rebase");
        }

        Ok(IntegrationOutcome::Clean)
    }

    fn abort_pending(&self) -> Result<()> {
        let state = self.pending_state();

        if state == RepositoryState::Merge {
            tracing::info!("Aborting merge");
            self.git_checked(&["merge", "--abort"])?;
        } else if is_rebase(state) {
            tracing::info!("Aborting rebase");
            self.git_checked(&["rebase", "--abort"])?;
        }

        Ok(())
    }

    fn tag(&self, name: &str, target: &str, message: &str) -> Result<()> {
        tracing::info!(tag = name, target, "Creating tag");
        self.git_checked(&["tag", "-a", name, "-m", message, target])?;
        Ok(())
    }

    fn tag_exists(&self, name: &str) -> Result<bool> {
        Ok(self.reference_exists(&format!("refs/tags/{}", name)))
    }

    fn fetch(&self, remote: &str) -> Result<()> {
        tracing::info!(remote, "Fetching");
        let output = self.git(&["fetch", "--quiet", remote])?;
        if !output.status.success() {
            return Err(Error::Remote(format!(
                "Fetch from '{}' failed: {}",
                remote,
                stderr_of(&output)
            )));
        }
        Ok(())
    }

    fn push(&self, remote: &str, branch: &str) -> Result<()> {
        tracing::info!(remote, branch, "Pushing");
        let output = self.git(&["push", "--quiet", "--set-upstream", remote, branch])?;
        if !output.status.success() {
            return Err(Error::Remote(format!(
                "Push of '{}' to '{}' failed: {}",
                branch,
                remote,
                stderr_of(&output)
            )));
        }
        Ok(())
    }

    fn delete_remote_branch(&self, remote: &str, branch: &str) -> Result<()> {
        tracing::info!(remote, branch, "Deleting remote branch");
        let output = self.git(&["push", "--quiet", remote, "--delete", branch])?;
        if !output.status.success() {
            return Err(Error::Remote(format!(
                "Deleting '{}' on '{}' failed: {}",
                branch,
                remote,
                stderr_of(&output)
            )));
        }
        Ok(())
    }

    fn current_branch(&self) -> Result<Option<String>> {
        self.head_branch()
    }

    fn branch_exists(&self, name: &str) -> Result<bool> {
        Ok(self.reference_exists(&format!("refs/heads/{}", name)))
    }

    fn remote_branch_exists(&self, remote: &str, name: &str) -> Result<bool> {
        Ok(self.reference_exists(&format!("refs/remotes/{}/{}", remote, name)))
    }

    fn list_branches(&self) -> Result<Vec<String>> {
        self.list_local_branches()
    }

    fn has_unresolved_conflicts(&self) -> Result<bool> {
        Ok(!self.conflicted_paths()?.is_empty())
    }
}
