//! The resumable finish operation record
//!
//! A finish runs as a small forward-only state machine:
//! 1. `merge` - fold the topic branch into its parent (and tag)
//! 2. `update_children` - cascade the parent into its child base branches
//! 3. `delete_branch` - remove the topic branch
//!
//! The record is written at every step boundary so an interrupted finish can
//! be continued or aborted by a later invocation. Field names are part of the
//! on-disk format and only ever grow.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::branch::{BranchIdentity, BranchType, Strategy};
use crate::{Error, Result};

/// Operation kinds that can be resumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationAction {
    /// Finishing a topic branch
    Finish,
}

/// Step of a finish operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishStep {
    /// Integrate the topic branch into its parent
    Merge,
    /// Cascade the parent into its child base branches
    UpdateChildren,
    /// Delete the finished topic branch
    DeleteBranch,
}

impl FinishStep {
    /// The step after this one, `None` after the last
    pub fn next(&self) -> Option<FinishStep> {
        match self {
            FinishStep::Merge => Some(FinishStep::UpdateChildren),
            FinishStep::UpdateChildren => Some(FinishStep::DeleteBranch),
            FinishStep::DeleteBranch => None,
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            FinishStep::Merge => "merging into parent",
            FinishStep::UpdateChildren => "updating child branches",
            FinishStep::DeleteBranch => "deleting branch",
        }
    }
}

impl fmt::Display for FinishStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Tag to create on the parent once the merge step completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagSpec {
    /// Tag name
    pub name: String,
    /// Annotation message, may be empty
    pub message: String,
}

/// Finish options resolved at the start of the operation
///
/// Persisted so `--continue` honors the flags of the original invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordedOptions {
    /// Tag to create, `None` when tagging is off
    pub tag: Option<TagSpec>,
    /// Keep the local topic branch
    pub keep_local: bool,
    /// Delete the local branch even if git considers it unmerged
    pub force_delete: bool,
    /// Delete the topic branch on the remote
    pub delete_remote: bool,
}

/// Persisted checkpoint of an in-flight finish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationRecord {
    /// What is being done
    pub action: OperationAction,
    /// Topic branch type name
    pub branch_type: String,
    /// Short topic branch name
    pub branch_name: String,
    /// Full topic branch name
    pub full_branch_name: String,
    /// The branch the topic branch finishes into
    pub parent_branch: String,
    /// Strategy of the integration at the current step
    pub merge_strategy: Strategy,
    /// Step to run (or re-run) next
    pub current_step: FinishStep,
    /// Child base branches receiving the cascade, in order
    #[serde(default)]
    pub child_branches: Vec<String>,
    /// Children already updated, in order
    #[serde(default)]
    pub updated_branches: Vec<String>,
    /// Resolved finish options
    #[serde(default)]
    pub options: RecordedOptions,
}

impl OperationRecord {
    /// Start a finish record at the merge step
    pub fn finish(identity: &BranchIdentity, branch_type: &BranchType, options: RecordedOptions) -> Self {
        Self {
            action: OperationAction::Finish,
            branch_type: branch_type.name.clone(),
            branch_name: identity.short_name.clone(),
            full_branch_name: identity.full_name.clone(),
            parent_branch: branch_type.parent.clone(),
            merge_strategy: branch_type.upstream_strategy,
            current_step: FinishStep::Merge,
            child_branches: Vec::new(),
            updated_branches: Vec::new(),
            options,
        }
    }

    /// Move to a later step
    ///
    /// Steps only move forward; going back is an internal error.
    pub fn advance_to(&mut self, step: FinishStep) -> Result<()> {
        if step <= self.current_step {
            return Err(Error::Other(format!(
                "Invalid finish step transition from {:?} to {:?}",
                self.current_step, step
            )));
        }

        tracing::info!(
            branch = %self.full_branch_name,
            from = ?self.current_step,
            to = ?step,
            "Finish step transition"
        );

        self.current_step = step;
        Ok(())
    }

    /// Record a completed child update
    pub fn mark_updated(&mut self, child: &str) -> Result<()> {
        if !self.child_branches.iter().any(|c| c == child) {
            return Err(Error::Other(format!(
                "'{}' is not part of the cascade for {}",
                child, self.full_branch_name
            )));
        }
        if !self.updated_branches.iter().any(|c| c == child) {
            self.updated_branches.push(child.to_string());
        }
        Ok(())
    }

    /// Children still waiting for the cascade, in order
    pub fn pending_children(&self) -> Vec<String> {
        self.child_branches
            .iter()
            .filter(|c| !self.updated_branches.contains(c))
            .cloned()
            .collect()
    }

    /// Whether user input names this record's branch
    ///
    /// Accepts the short name, the full name or an abbreviation of the short
    /// name.
    pub fn matches(&self, input: &str) -> bool {
        input == self.branch_name
            || input == self.full_branch_name
            || (!input.is_empty() && self.branch_name.starts_with(input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> OperationRecord {
        let release = BranchType::new("release", "release/", "main").with_tag("v");
        let identity = BranchIdentity::topic(&release, "1.0");
        let mut record = OperationRecord::finish(&identity, &release, RecordedOptions::default());
        record.child_branches = vec!["develop".into(), "staging".into()];
        record
    }

    #[test]
    fn test_step_order() {
        assert_eq!(FinishStep::Merge.next(), Some(FinishStep::UpdateChildren));
        assert_eq!(FinishStep::UpdateChildren.next(), Some(FinishStep::DeleteBranch));
        assert_eq!(FinishStep::DeleteBranch.next(), None);
    }

    #[test]
    fn test_advance_forward_only() {
        let mut r = record();
        r.advance_to(FinishStep::UpdateChildren).unwrap();
        assert!(r.advance_to(FinishStep::Merge).is_err());
        assert!(r.advance_to(FinishStep::UpdateChildren).is_err());
        r.advance_to(FinishStep::DeleteBranch).unwrap();
        assert_eq!(r.current_step, FinishStep::DeleteBranch);
    }

    #[test]
    fn test_mark_updated_subset() {
        let mut r = record();
        r.mark_updated("develop").unwrap();
        r.mark_updated("develop").unwrap();
        assert_eq!(r.updated_branches, vec!["develop"]);
        assert_eq!(r.pending_children(), vec!["staging"]);
        assert!(r.mark_updated("feature/x").is_err());
    }

    #[test]
    fn test_serialized_field_names() {
        let r = record();
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["action"], "finish");
        assert_eq!(json["branchType"], "release");
        assert_eq!(json["branchName"], "1.0");
        assert_eq!(json["fullBranchName"], "release/1.0");
        assert_eq!(json["parentBranch"], "main");
        assert_eq!(json["mergeStrategy"], "merge");
        assert_eq!(json["currentStep"], "merge");
        assert_eq!(json["childBranches"][0], "develop");
        assert!(json["updatedBranches"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_missing_additive_fields_default() {
        let json = r#"{
            "action": "finish",
            "branchType": "feature",
            "branchName": "x",
            "fullBranchName": "feature/x",
            "parentBranch": "develop",
            "mergeStrategy": "rebase",
            "currentStep": "update_children"
        }"#;
        let r: OperationRecord = serde_json::from_str(json).unwrap();
        assert_eq!(r.current_step, FinishStep::UpdateChildren);
        assert_eq!(r.merge_strategy, Strategy::Rebase);
        assert!(r.child_branches.is_empty());
        assert_eq!(r.options, RecordedOptions::default());
    }

    #[test]
    fn test_matches() {
        let r = record();
        assert!(r.matches("1.0"));
        assert!(r.matches("release/1.0"));
        assert!(r.matches("1"));
        assert!(!r.matches("2.0"));
        assert!(!r.matches(""));
    }
}
