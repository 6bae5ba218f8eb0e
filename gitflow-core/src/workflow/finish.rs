//! Finishing topic branches
//!
//! A finish is checkpointed on entry to every step and after every child
//! update, so a conflict (or a crash) at any point leaves a record that
//! `--continue` re-enters at the interrupted step. Re-running an integration
//! whose conflict was already concluded is a no-op in git, so re-entry never
//! duplicates work. A new finish whose merge step fails for any other reason
//! leaves no record behind.

use super::record::{FinishStep, OperationRecord, RecordedOptions};
use super::tag::{TagOptions, TagPolicy};
use super::{merge_conflict, rebase_conflict, Orchestrator};
use crate::branch::{resolve, Strategy};
use crate::git::IntegrationOutcome;
use crate::{Error, Result};

/// Flags of a finish invocation
///
/// `None` falls back to the branch type's configured default.
#[derive(Debug, Clone, Default)]
pub struct FinishOptions {
    /// Tag flags
    pub tag: TagOptions,
    /// `--keeplocal`
    pub keep_local: Option<bool>,
    /// `--force-delete`
    pub force_delete: Option<bool>,
    /// `--deleteremote` / `--no-deleteremote`
    pub delete_remote: Option<bool>,
    /// `--fetch` / `--no-fetch`
    pub fetch: Option<bool>,
}

/// Result of a completed finish
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinishOutcome {
    /// Finished topic branch
    pub branch: String,
    /// Branch it was finished into
    pub parent: String,
    /// Tag on the parent, if tagging was on
    pub tag: Option<String>,
    /// Child base branches that received the cascade
    pub updated_children: Vec<String>,
    /// Whether the local branch was deleted
    pub deleted_local: bool,
    /// Whether the remote branch was deleted
    pub deleted_remote: bool,
    /// Non-fatal problems during cleanup
    pub warnings: Vec<String>,
}

impl FinishOutcome {
    fn new(record: &OperationRecord) -> Self {
        Self {
            branch: record.full_branch_name.clone(),
            parent: record.parent_branch.clone(),
            tag: record.options.tag.as_ref().map(|t| t.name.clone()),
            updated_children: Vec::new(),
            deleted_local: false,
            deleted_remote: false,
            warnings: Vec::new(),
        }
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.warnings.push(message);
    }
}

/// Result of `--abort`
#[derive(Debug)]
pub enum AbortOutcome {
    /// The pending finish was abandoned
    Aborted(OperationRecord),
    /// The record could not be read and was removed
    Discarded {
        /// Why the record could not be read
        reason: String,
    },
}

impl Orchestrator<'_> {
    /// Finish a topic branch
    ///
    /// * `scope` - branch type, `None` to infer it from the current branch
    /// * `name` - branch name, `None` for the current branch
    pub fn finish(
        &self,
        scope: Option<&str>,
        name: Option<&str>,
        options: &FinishOptions,
    ) -> Result<FinishOutcome> {
        self.ensure_idle()?;

        let identity = resolve(self.config, self.vcs, scope, name)?;
        let branch_type = self.topic_type(&identity)?;
        self.require_branch(&identity.full_name)?;
        self.require_branch(&branch_type.parent)?;

        let recorded = RecordedOptions {
            tag: TagPolicy::new(branch_type, &options.tag).plan(&identity.short_name)?,
            keep_local: options.keep_local.unwrap_or(branch_type.finish_keep_local),
            force_delete: options.force_delete.unwrap_or(branch_type.finish_force_delete),
            delete_remote: options
                .delete_remote
                .unwrap_or(branch_type.delete_remote_default),
        };

        if options.fetch.unwrap_or(branch_type.fetch_on_finish) {
            self.vcs.fetch(&self.remote)?;
        }

        tracing::info!(
            branch = %identity.full_name,
            parent = %branch_type.parent,
            strategy = %branch_type.upstream_strategy,
            "Finishing branch"
        );

        self.run_finish(OperationRecord::finish(&identity, branch_type, recorded), true)
    }

    /// Resume a finish stopped on conflicts
    pub fn continue_finish(&self, scope: Option<&str>, name: Option<&str>) -> Result<FinishOutcome> {
        let record = self.pending_for(scope, name)?;

        if self.vcs.has_unresolved_conflicts()? {
            return Err(Error::UnresolvedConflicts);
        }

        if let IntegrationOutcome::Conflict(paths) = self.vcs.continue_pending()? {
            return Err(conflict_for(&record, paths));
        }

        tracing::info!(
            branch = %record.full_branch_name,
            step = ?record.current_step,
            "Continuing finish"
        );

        self.run_finish(record, false)
    }

    /// Abandon a pending finish
    ///
    /// Steps already completed stay in history; the record is cleared even if
    /// reverting the working tree fails. An unreadable record is removed and
    /// reported as discarded.
    pub fn abort_finish(&self, scope: Option<&str>, name: Option<&str>) -> Result<AbortOutcome> {
        let record = match self.pending_for(scope, name) {
            Ok(record) => record,
            Err(Error::Persistence(reason)) if matches!(self.store.in_progress(), Ok(true)) => {
                tracing::warn!(reason = %reason, "Discarding unreadable operation record");
                let reverted = self.vcs.abort_pending();
                self.store.clear()?;
                reverted?;
                return Ok(AbortOutcome::Discarded { reason });
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            branch = %record.full_branch_name,
            step = ?record.current_step,
            "Aborting finish"
        );

        let reverted = self.vcs.abort_pending().and_then(|()| {
            if self.vcs.branch_exists(&record.full_branch_name)? {
                self.vcs.checkout(&record.full_branch_name)?;
            }
            Ok(())
        });

        self.store.clear()?;
        reverted?;

        Ok(AbortOutcome::Aborted(record))
    }

    /// The pending record, checked against an optional type and name
    fn pending_for(&self, scope: Option<&str>, name: Option<&str>) -> Result<OperationRecord> {
        let record = self.store.load()?.ok_or(Error::NoOperationInProgress)?;

        let same_type = scope.is_none_or(|s| s == record.branch_type);
        let same_branch = name.is_none_or(|n| record.matches(n));
        if !(same_type && same_branch) {
            return Err(Error::ConflictingOperation(record.full_branch_name));
        }

        Ok(record)
    }

    /// Drive the record through its remaining steps
    ///
    /// `fresh` is set for a new finish: if its merge step fails without a
    /// conflict, nothing is left to resume and the record is dropped.
    fn run_finish(&self, mut record: OperationRecord, fresh: bool) -> Result<FinishOutcome> {
        let mut outcome = FinishOutcome::new(&record);

        loop {
            self.store.save(&record)?;

            match record.current_step {
                FinishStep::Merge => {
                    let merged = self
                        .fold_topic(&record)
                        .and_then(|()| self.apply_tag(&record));
                    if let Err(err) = merged {
                        if fresh && !err.is_conflict() {
                            self.discard(&record);
                        }
                        return Err(err);
                    }

                    record.child_branches = self
                        .config
                        .children_of(&record.parent_branch)
                        .into_iter()
                        .map(|b| b.name.clone())
                        .collect();
                    record.advance_to(FinishStep::UpdateChildren)?;
                }
                FinishStep::UpdateChildren => {
                    self.cascade(&mut record)?;
                    record.advance_to(FinishStep::DeleteBranch)?;
                }
                FinishStep::DeleteBranch => {
                    outcome.updated_children = record.updated_branches.clone();
                    self.delete_finished(&record, &mut outcome)?;
                    self.store.clear()?;

                    tracing::info!(branch = %record.full_branch_name, "Finish complete");
                    return Ok(outcome);
                }
            }
        }
    }

    /// Drop the record of a finish that failed before stopping on a conflict
    fn discard(&self, record: &OperationRecord) {
        tracing::info!(branch = %record.full_branch_name, "Finish failed, dropping record");
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Could not clear operation record");
        }
    }

    /// Integrate the topic branch into its parent
    fn fold_topic(&self, record: &OperationRecord) -> Result<()> {
        let topic = &record.full_branch_name;
        let parent = &record.parent_branch;

        match record.merge_strategy {
            Strategy::Merge => self.integrate(topic, parent, Strategy::Merge),
            Strategy::Rebase => {
                self.integrate(parent, topic, Strategy::Rebase)?;
                self.vcs.checkout(parent)?;
                self.vcs.fast_forward(topic)
            }
        }
    }

    fn apply_tag(&self, record: &OperationRecord) -> Result<()> {
        let Some(tag) = &record.options.tag else {
            return Ok(());
        };

        if self.vcs.tag_exists(&tag.name)? {
            tracing::info!(tag = %tag.name, "Tag already exists, skipping");
            return Ok(());
        }

        self.vcs.tag(&tag.name, &record.parent_branch, &tag.message)
    }

    /// Push the parent into every child not yet updated
    fn cascade(&self, record: &mut OperationRecord) -> Result<()> {
        for child in record.pending_children() {
            let strategy = self
                .config
                .base(&child)
                .map(|b| b.downstream_strategy)
                .unwrap_or_default();

            record.merge_strategy = strategy;
            self.store.save(record)?;

            tracing::info!(
                child = %child,
                parent = %record.parent_branch,
                strategy = %strategy,
                "Updating child branch"
            );
            self.integrate(&record.parent_branch, &child, strategy)?;

            record.mark_updated(&child)?;
            self.store.save(record)?;
        }
        Ok(())
    }

    fn delete_finished(&self, record: &OperationRecord, outcome: &mut FinishOutcome) -> Result<()> {
        let branch = &record.full_branch_name;
        self.vcs.checkout(&record.parent_branch)?;

        if record.options.keep_local {
            tracing::info!(branch = %branch, "Keeping local branch");
        } else {
            match self.vcs.branch_exists(branch) {
                Ok(true) => match self.vcs.delete_branch(branch, record.options.force_delete) {
                    Ok(()) => outcome.deleted_local = true,
                    Err(e) => outcome.warn(format!("Could not delete branch '{}': {}", branch, e)),
                },
                Ok(false) => {}
                Err(e) => outcome.warn(format!("Could not inspect branch '{}': {}", branch, e)),
            }
        }

        if record.options.delete_remote {
            match self.vcs.remote_branch_exists(&self.remote, branch) {
                Ok(true) => match self.vcs.delete_remote_branch(&self.remote, branch) {
                    Ok(()) => outcome.deleted_remote = true,
                    Err(e) => outcome.warn(format!(
                        "Could not delete '{}' on '{}': {}",
                        branch, self.remote, e
                    )),
                },
                Ok(false) => {
                    tracing::debug!(branch = %branch, remote = %self.remote, "No remote branch to delete");
                }
                Err(e) => outcome.warn(format!(
                    "Could not inspect '{}' on '{}': {}",
                    branch, self.remote, e
                )),
            }
        }

        Ok(())
    }
}

/// Conflict error for an integration stopped again while continuing
fn conflict_for(record: &OperationRecord, paths: Vec<String>) -> Error {
    let topic = record.full_branch_name.as_str();
    let parent = record.parent_branch.as_str();

    match (record.current_step, record.pending_children().first(), record.merge_strategy) {
        (FinishStep::UpdateChildren, Some(child), Strategy::Merge) => {
            merge_conflict(parent, child, paths)
        }
        (FinishStep::UpdateChildren, Some(child), Strategy::Rebase) => {
            rebase_conflict(child, parent, paths)
        }
        (_, _, Strategy::Merge) => merge_conflict(topic, parent, paths),
        (_, _, Strategy::Rebase) => rebase_conflict(topic, parent, paths),
    }
}
