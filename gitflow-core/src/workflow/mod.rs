//! Finish/update orchestration
//!
//! The [`Orchestrator`] drives every branch operation through a
//! [`VcsDriver`] and checkpoints resumable work in a [`StateStore`]:
//! - **finish**: merge a topic branch into its parent, cascade the parent into
//!   its child base branches, delete the topic branch
//! - **update**: bring a branch up to date with its parent
//! - **start / publish / delete / list**: topic branch housekeeping

mod finish;
mod record;
mod store;
mod tag;
mod topic;
mod update;

pub use finish::{AbortOutcome, FinishOptions, FinishOutcome};
pub use record::{FinishStep, OperationAction, OperationRecord, RecordedOptions, TagSpec};
pub use store::{FileStateStore, MemoryStateStore, StateStore};
pub use tag::{TagOptions, TagPolicy};
pub use topic::{DeleteOptions, DeleteOutcome, StartOptions, TopicBranch};
pub use update::{UpdateOptions, UpdateOutcome};

use crate::branch::{BranchConfig, BranchIdentity, BranchType, Strategy};
use crate::config::DEFAULT_REMOTE;
use crate::git::{IntegrationOutcome, VcsDriver};
use crate::{Error, Result};

/// Runs branch operations against one repository
pub struct Orchestrator<'a> {
    config: &'a BranchConfig,
    vcs: &'a dyn VcsDriver,
    store: &'a dyn StateStore,
    remote: String,
}

impl<'a> Orchestrator<'a> {
    /// Create an orchestrator using the default remote
    pub fn new(config: &'a BranchConfig, vcs: &'a dyn VcsDriver, store: &'a dyn StateStore) -> Self {
        Self {
            config,
            vcs,
            store,
            remote: DEFAULT_REMOTE.to_string(),
        }
    }

    /// Use a different remote for fetch, push and remote deletion
    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = remote.into();
        self
    }

    /// The branch hierarchy in use
    pub fn config(&self) -> &'a BranchConfig {
        self.config
    }

    /// Remote name in use
    pub fn remote(&self) -> &str {
        &self.remote
    }

    /// The pending operation, if any
    pub fn pending(&self) -> Result<Option<OperationRecord>> {
        self.store.load()
    }

    /// Fail with `ConflictingOperation` while a finish is pending
    fn ensure_idle(&self) -> Result<()> {
        match self.store.load()? {
            Some(record) => Err(Error::ConflictingOperation(record.full_branch_name)),
            None => Ok(()),
        }
    }

    /// Branch type of a resolved topic branch
    fn topic_type(&self, identity: &BranchIdentity) -> Result<&'a BranchType> {
        let config: &'a BranchConfig = self.config;
        match identity.type_name() {
            Some(type_name) => config.require_type(type_name),
            None => Err(Error::NotATopicBranch(identity.full_name.clone())),
        }
    }

    fn require_branch(&self, name: &str) -> Result<()> {
        if self.vcs.branch_exists(name)? {
            Ok(())
        } else {
            Err(Error::BranchNotFound(name.to_string()))
        }
    }

    /// Bring `source` into `target`
    ///
    /// Merge checks out `target` and merges `source`; rebase checks out
    /// `target` and replays it onto `source`. Conflicts leave the working
    /// tree stopped and surface as the matching conflict error.
    fn integrate(&self, source: &str, target: &str, strategy: Strategy) -> Result<()> {
        self.vcs.checkout(target)?;
        match strategy {
            Strategy::Merge => match self.vcs.merge(source)? {
                IntegrationOutcome::Clean => Ok(()),
                IntegrationOutcome::Conflict(paths) => {
                    Err(merge_conflict(source, target, paths))
                }
            },
            Strategy::Rebase => match self.vcs.rebase(source)? {
                IntegrationOutcome::Clean => Ok(()),
                IntegrationOutcome::Conflict(paths) => {
                    Err(rebase_conflict(target, source, paths))
                }
            },
        }
    }
}

fn merge_conflict(source: &str, target: &str, paths: Vec<String>) -> Error {
    Error::MergeConflict {
        source_branch: source.to_string(),
        target: target.to_string(),
        paths,
    }
}

fn rebase_conflict(branch: &str, onto: &str, paths: Vec<String>) -> Error {
    Error::RebaseConflict {
        branch: branch.to_string(),
        onto: onto.to_string(),
        paths,
    }
}
