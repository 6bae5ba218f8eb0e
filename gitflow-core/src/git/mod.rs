//! Git operations for git-flow
//!
//! The orchestrator only talks to git through [`VcsDriver`]. [`GitRepo`] is
//! the real implementation: reads go through `git2`, mutations through the
//! `git` executable so hooks, merge drivers and rerere behave as the user
//! expects.

mod driver;
mod repo;

pub use repo::GitRepo;

use crate::Result;

/// Result of a merge or rebase
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationOutcome {
    /// Completed without conflicts
    Clean,
    /// Stopped with conflicts in the listed paths; the working tree is left
    /// in git's conflicted state
    Conflict(Vec<String>),
}

/// Primitive version-control operations consumed by the orchestrator
pub trait VcsDriver {
    /// Check out an existing local branch
    fn checkout(&self, branch: &str) -> Result<()>;

    /// Create a branch at `start_point`; fails with `BranchExists`
    fn create_branch(&self, name: &str, start_point: &str) -> Result<()>;

    /// Delete a local branch; fails with `UnmergedChanges` unless forced
    fn delete_branch(&self, name: &str, force: bool) -> Result<()>;

    /// Merge `branch` into the checked-out branch with a merge commit
    fn merge(&self, branch: &str) -> Result<IntegrationOutcome>;

    /// Fast-forward the checked-out branch to `branch`
    fn fast_forward(&self, branch: &str) -> Result<()>;

    /// Rebase the checked-out branch onto `onto`
    fn rebase(&self, onto: &str) -> Result<IntegrationOutcome>;

    /// Conclude a merge/rebase stopped on conflicts the user has resolved
    ///
    /// No-op when nothing is pending.
    fn continue_pending(&self) -> Result<IntegrationOutcome>;

    /// Abort a pending merge/rebase; no-op when nothing is pending
    fn abort_pending(&self) -> Result<()>;

    /// Create an annotated tag on `target`
    fn tag(&self, name: &str, target: &str, message: &str) -> Result<()>;

    /// Whether a tag exists
    fn tag_exists(&self, name: &str) -> Result<bool>;

    /// Fetch from a remote
    fn fetch(&self, remote: &str) -> Result<()>;

    /// Push a branch and set its upstream
    fn push(&self, remote: &str, branch: &str) -> Result<()>;

    /// Delete a branch on a remote
    fn delete_remote_branch(&self, remote: &str, branch: &str) -> Result<()>;

    /// Checked-out branch, `None` when HEAD is detached or unborn
    fn current_branch(&self) -> Result<Option<String>>;

    /// Whether a local branch exists
    fn branch_exists(&self, name: &str) -> Result<bool>;

    /// Whether a remote tracking branch exists
    fn remote_branch_exists(&self, remote: &str, name: &str) -> Result<bool>;

    /// All local branch names
    fn list_branches(&self) -> Result<Vec<String>>;

    /// Whether the index has unmerged entries
    fn has_unresolved_conflicts(&self) -> Result<bool>;
}
