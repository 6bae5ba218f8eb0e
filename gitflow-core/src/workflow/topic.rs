//! Topic branch housekeeping: start, publish, delete, list

use super::Orchestrator;
use crate::branch::{resolve, BranchIdentity, BranchKind};
use crate::{Error, Result};

/// Flags of a start invocation
#[derive(Debug, Clone, Default)]
pub struct StartOptions {
    /// Start from this branch instead of the type's start point
    pub base: Option<String>,
    /// Fetch first; `None` uses the type's `start.fetch` default
    pub fetch: Option<bool>,
}

/// Flags of a delete invocation
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteOptions {
    /// Delete even if unmerged
    pub force: bool,
    /// Delete on the remote too; `None` uses the type default
    pub remote: Option<bool>,
}

/// Result of a delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    /// Deleted branch
    pub branch: String,
    /// Whether the remote branch was deleted
    pub deleted_remote: bool,
}

/// An existing topic branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicBranch {
    /// Resolved identity
    pub identity: BranchIdentity,
    /// Whether it is checked out
    pub current: bool,
}

impl Orchestrator<'_> {
    /// Create a topic branch and check it out
    pub fn start(&self, type_name: &str, name: &str, options: &StartOptions) -> Result<BranchIdentity> {
        self.ensure_idle()?;

        let branch_type = self.config.require_type(type_name)?;
        let short = branch_type.short_name(name).unwrap_or(name);
        if short.trim().is_empty() {
            return Err(Error::Other(format!("A {} branch needs a name", type_name)));
        }

        let identity = BranchIdentity::topic(branch_type, short);
        if self.vcs.branch_exists(&identity.full_name)? {
            return Err(Error::BranchExists(identity.full_name));
        }

        let start_point = options
            .base
            .as_deref()
            .unwrap_or_else(|| branch_type.start_branch());
        self.require_branch(start_point)?;

        if options.fetch.unwrap_or(branch_type.fetch_on_start) {
            self.vcs.fetch(&self.remote)?;
        }

        tracing::info!(branch = %identity.full_name, start_point, "Starting branch");
        self.vcs.create_branch(&identity.full_name, start_point)?;
        self.vcs.checkout(&identity.full_name)?;

        Ok(identity)
    }

    /// Push a topic branch to the remote with upstream tracking
    pub fn publish(&self, scope: Option<&str>, name: Option<&str>) -> Result<BranchIdentity> {
        let identity = resolve(self.config, self.vcs, scope, name)?;
        self.topic_type(&identity)?;
        self.require_branch(&identity.full_name)?;

        self.vcs.push(&self.remote, &identity.full_name)?;
        Ok(identity)
    }

    /// Delete a topic branch without finishing it
    pub fn delete(
        &self,
        scope: Option<&str>,
        name: Option<&str>,
        options: DeleteOptions,
    ) -> Result<DeleteOutcome> {
        let identity = resolve(self.config, self.vcs, scope, name)?;
        let branch_type = self.topic_type(&identity)?;

        if let Some(record) = self.store.load()? {
            if record.full_branch_name == identity.full_name {
                return Err(Error::ConflictingOperation(record.full_branch_name));
            }
        }

        if self.vcs.current_branch()?.as_deref() == Some(identity.full_name.as_str()) {
            self.vcs.checkout(&branch_type.parent)?;
        }

        self.vcs.delete_branch(&identity.full_name, options.force)?;

        let mut deleted_remote = false;
        if options.remote.unwrap_or(branch_type.delete_remote_default)
            && self.vcs.remote_branch_exists(&self.remote, &identity.full_name)?
        {
            self.vcs.delete_remote_branch(&self.remote, &identity.full_name)?;
            deleted_remote = true;
        }

        Ok(DeleteOutcome {
            branch: identity.full_name,
            deleted_remote,
        })
    }

    /// Existing branches of a type, sorted by short name
    pub fn list(&self, type_name: &str) -> Result<Vec<TopicBranch>> {
        let branch_type = self.config.require_type(type_name)?;
        let current = self.vcs.current_branch()?;

        let mut branches: Vec<TopicBranch> = self
            .vcs
            .list_branches()?
            .into_iter()
            .filter(|full| {
                matches!(self.config.type_of(full), Ok(BranchKind::Topic(t)) if t.name == branch_type.name)
            })
            .filter_map(|full| {
                let short = branch_type.short_name(&full)?;
                Some(TopicBranch {
                    identity: BranchIdentity::topic(branch_type, short),
                    current: current.as_deref() == Some(full.as_str()),
                })
            })
            .collect();

        branches.sort_by(|a, b| a.identity.short_name.cmp(&b.identity.short_name));
        Ok(branches)
    }
}
