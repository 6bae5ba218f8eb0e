//! Branch name resolution
//!
//! Turns what the user typed (`login`, `feature/login`, `log`) into the full
//! identity of an existing branch. The resolver never prompts: more than one
//! match is always an error.

use super::model::{BranchConfig, BranchIdentity, BranchKind, BranchType};
use crate::git::VcsDriver;
use crate::{Error, Result};

/// Outcome of matching user input against short names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShortNameMatch<'a> {
    /// Exactly one branch matched
    Unique(&'a str),
    /// Nothing matched
    NoMatch,
    /// Several branches matched, sorted
    Ambiguous(Vec<&'a str>),
}

/// Match `input` against existing short names
///
/// An exact match wins; otherwise every short name starting with `input` is a
/// candidate and anything but exactly one candidate is a failure.
pub fn match_short_name<'a>(input: &str, short_names: &[&'a str]) -> ShortNameMatch<'a> {
    if let Some(exact) = short_names.iter().find(|name| **name == input) {
        return ShortNameMatch::Unique(exact);
    }

    let mut candidates: Vec<&'a str> = short_names
        .iter()
        .copied()
        .filter(|name| name.starts_with(input))
        .collect();
    candidates.sort_unstable();
    candidates.dedup();

    match candidates.len() {
        0 => ShortNameMatch::NoMatch,
        1 => ShortNameMatch::Unique(candidates[0]),
        _ => ShortNameMatch::Ambiguous(candidates),
    }
}

/// Resolve a branch of a given type, or of the current branch's type
///
/// * `scope` - topic type name; `None` infers it from the checked-out branch
/// * `input` - user supplied name; `None` targets the checked-out branch
pub fn resolve(
    config: &BranchConfig,
    vcs: &dyn VcsDriver,
    scope: Option<&str>,
    input: Option<&str>,
) -> Result<BranchIdentity> {
    match (scope, input) {
        (Some(type_name), Some(input)) => {
            let branch_type = config.require_type(type_name)?;
            resolve_in_type(config, vcs, branch_type, input)
        }
        (Some(type_name), None) => {
            let branch_type = config.require_type(type_name)?;
            let current = current_branch(vcs)?;
            match config.type_of(&current)? {
                BranchKind::Topic(t) if t.name == branch_type.name => config.identify(&current),
                BranchKind::Base(_) => Err(Error::NotATopicBranch(current)),
                BranchKind::Topic(_) => Err(Error::UnknownBranchType(format!(
                    "{} (expected a {} branch)",
                    current, branch_type.name
                ))),
            }
        }
        (None, None) => {
            let current = current_branch(vcs)?;
            config.identify(&current)
        }
        (None, Some(input)) => {
            if config.base(input).is_some() {
                return Ok(BranchIdentity::base(input));
            }
            let current = current_branch(vcs)?;
            match config.type_of(&current)? {
                BranchKind::Topic(branch_type) => resolve_in_type(config, vcs, branch_type, input),
                BranchKind::Base(_) => Err(Error::UnknownBranchType(input.to_string())),
            }
        }
    }
}

fn resolve_in_type(
    config: &BranchConfig,
    vcs: &dyn VcsDriver,
    branch_type: &BranchType,
    input: &str,
) -> Result<BranchIdentity> {
    let wanted = branch_type.short_name(input).unwrap_or(input);
    if wanted.is_empty() {
        return Err(Error::BranchNotFound(input.to_string()));
    }

    let existing = vcs.list_branches()?;
    let short_names: Vec<&str> = existing
        .iter()
        .filter(|full| {
            matches!(config.type_of(full), Ok(BranchKind::Topic(t)) if t.name == branch_type.name)
        })
        .filter_map(|full| branch_type.short_name(full))
        .collect();

    tracing::debug!(
        branch_type = %branch_type.name,
        input = wanted,
        candidates = short_names.len(),
        "Resolving branch name"
    );

    match match_short_name(wanted, &short_names) {
        ShortNameMatch::Unique(short) => Ok(BranchIdentity::topic(branch_type, short)),
        ShortNameMatch::NoMatch => Err(Error::BranchNotFound(branch_type.full_name(wanted))),
        ShortNameMatch::Ambiguous(candidates) => Err(Error::AmbiguousBranch {
            input: input.to_string(),
            candidates: candidates
                .into_iter()
                .map(|short| branch_type.full_name(short))
                .collect(),
        }),
    }
}

fn current_branch(vcs: &dyn VcsDriver) -> Result<String> {
    vcs.current_branch()?
        .ok_or_else(|| Error::Git("HEAD is detached; check out a branch first".to_string()))
}
