//! Error types for git-flow

use thiserror::Error;

/// Result type alias for git-flow operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for git-flow operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing, cyclic or otherwise invalid branch configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// No configured base branch or topic prefix matches the branch
    #[error("Unknown branch type for '{0}'")]
    UnknownBranchType(String),

    /// The branch the user asked for does not exist
    #[error("Branch '{0}' not found")]
    BranchNotFound(String),

    /// A short name matched more than one existing branch
    #[error("Ambiguous branch name '{input}', candidates: {}", candidates.join(", "))]
    AmbiguousBranch {
        /// What the user typed
        input: String,
        /// Full names of every matching branch
        candidates: Vec<String>,
    },

    /// Branch to be created already exists
    #[error("Branch '{0}' already exists")]
    BranchExists(String),

    /// The resolved branch is a base branch where a topic branch is required
    #[error("'{0}' is a base branch, not a topic branch")]
    NotATopicBranch(String),

    /// A finish operation is already pending
    #[error(
        "A finish operation for '{0}' is already in progress. \
         Resolve it with --continue or --abort first."
    )]
    ConflictingOperation(String),

    /// `--continue` / `--abort` without a pending operation
    #[error("No operation in progress")]
    NoOperationInProgress,

    /// `--continue` while the working tree still has conflicts
    #[error("Unresolved conflicts remain in the working tree. Resolve and commit them first.")]
    UnresolvedConflicts,

    /// Merge stopped on conflicts
    #[error("Merge of '{source_branch}' into '{target}' has conflicts: {}", paths.join(", "))]
    MergeConflict {
        /// Branch being merged
        source_branch: String,
        /// Branch receiving the merge
        target: String,
        /// Conflicting paths
        paths: Vec<String>,
    },

    /// Rebase stopped on conflicts
    #[error("Rebase of '{branch}' onto '{onto}' has conflicts: {}", paths.join(", "))]
    RebaseConflict {
        /// Branch being rebased
        branch: String,
        /// Branch rebased onto
        onto: String,
        /// Conflicting paths
        paths: Vec<String>,
    },

    /// Branch deletion refused because it is not fully merged
    #[error("Branch '{0}' is not fully merged. Use force to delete it anyway.")]
    UnmergedChanges(String),

    /// The operation record could not be read or written
    #[error("Failed to persist operation state: {0}")]
    Persistence(String),

    /// Fetch or push failure
    #[error("Remote error: {0}")]
    Remote(String),

    /// Any other failure reported by git
    #[error("Git error: {0}")]
    Git(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Process exit code for this error's category
    ///
    /// Codes are stable so calling scripts can branch on the outcome.
    /// Exit code 2 is left to argument parsing errors.
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Io(_) | Error::Other(_) => 1,
            Error::Config(_) => 3,
            Error::UnknownBranchType(_)
            | Error::BranchNotFound(_)
            | Error::AmbiguousBranch { .. }
            | Error::BranchExists(_)
            | Error::NotATopicBranch(_) => 4,
            Error::ConflictingOperation(_)
            | Error::NoOperationInProgress
            | Error::UnresolvedConflicts => 5,
            Error::MergeConflict { .. } | Error::RebaseConflict { .. } => 6,
            Error::UnmergedChanges(_) => 7,
            Error::Persistence(_) => 8,
            Error::Remote(_) => 9,
            Error::Git(_) => 10,
        }
    }

    /// Whether the error leaves a resumable conflict behind
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::MergeConflict { .. } | Error::RebaseConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_category() {
        assert_eq!(Error::Config("x".into()).exit_code(), 3);
        assert_eq!(Error::BranchNotFound("x".into()).exit_code(), 4);
        assert_eq!(Error::NoOperationInProgress.exit_code(), 5);
        assert_eq!(Error::UnmergedChanges("x".into()).exit_code(), 7);
        assert_eq!(Error::Persistence("x".into()).exit_code(), 8);
        assert_eq!(Error::Remote("x".into()).exit_code(), 9);
        assert_eq!(Error::Git("x".into()).exit_code(), 10);

        let conflict = Error::MergeConflict {
            source_branch: "feature/x".into(),
            target: "develop".into(),
            paths: vec!["a.txt".into()],
        };
        assert_eq!(conflict.exit_code(), 6);
        assert!(conflict.is_conflict());
    }

    #[test]
    fn test_ambiguous_message_lists_candidates() {
        let err = Error::AmbiguousBranch {
            input: "test".into(),
            candidates: vec!["feature/test1-x".into(), "feature/test2-x".into()],
        };
        let msg = err.to_string();
        assert!(msg.contains("feature/test1-x"));
        assert!(msg.contains("feature/test2-x"));
    }
}
