//! Typed view of the configured branch hierarchy

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How one branch incorporates changes from another
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Merge commit (`--no-ff` when folding a topic branch into its parent)
    #[default]
    Merge,
    /// Replay commits on top of the other branch
    Rebase,
}

impl Strategy {
    /// Config/serialization spelling
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Merge => "merge",
            Strategy::Rebase => "rebase",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(Strategy::Merge),
            "rebase" => Ok(Strategy::Rebase),
            other => Err(Error::Config(format!(
                "Unknown strategy '{}', expected 'merge' or 'rebase'",
                other
            ))),
        }
    }
}

/// A configured topic branch type (feature, release, hotfix, ...)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchType {
    /// Type name, e.g. "feature"
    pub name: String,
    /// Prefix prepended to short names, may be empty
    pub prefix: String,
    /// Base branch the type finishes into
    pub parent: String,
    /// Base branch new topic branches start from, if not `parent`
    pub start_point: Option<String>,
    /// How the topic branch is folded into / updated from its parent
    pub upstream_strategy: Strategy,
    /// How changes flow down to dependents
    pub downstream_strategy: Strategy,
    /// Create a tag on the parent when finishing
    pub tag_enabled: bool,
    /// Prefix for generated tag names
    pub tag_prefix: String,
    /// Delete the remote branch when finishing
    pub delete_remote_default: bool,
    /// Fetch from the remote before starting
    pub fetch_on_start: bool,
    /// Fetch from the remote before finishing
    pub fetch_on_finish: bool,
    /// `finish.notag` config default
    pub finish_notag: bool,
    /// `finish.keep` config default
    pub finish_keep_local: bool,
    /// `finish.force-delete` config default
    pub finish_force_delete: bool,
    /// `finish.messagefile` config default
    pub finish_message_file: Option<String>,
}

impl BranchType {
    /// Create a branch type with default policies
    pub fn new(name: impl Into<String>, prefix: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            parent: parent.into(),
            start_point: None,
            upstream_strategy: Strategy::Merge,
            downstream_strategy: Strategy::Merge,
            tag_enabled: false,
            tag_prefix: String::new(),
            delete_remote_default: false,
            fetch_on_start: false,
            fetch_on_finish: false,
            finish_notag: false,
            finish_keep_local: false,
            finish_force_delete: false,
            finish_message_file: None,
        }
    }

    /// Set the branch new topic branches start from
    pub fn with_start_point(mut self, start_point: impl Into<String>) -> Self {
        self.start_point = Some(start_point.into());
        self
    }

    /// Set upstream and downstream strategies
    pub fn with_strategies(mut self, upstream: Strategy, downstream: Strategy) -> Self {
        self.upstream_strategy = upstream;
        self.downstream_strategy = downstream;
        self
    }

    /// Enable tagging on finish with the given tag prefix
    pub fn with_tag(mut self, tag_prefix: impl Into<String>) -> Self {
        self.tag_enabled = true;
        self.tag_prefix = tag_prefix.into();
        self
    }

    /// Branch new topic branches of this type are created from
    pub fn start_branch(&self) -> &str {
        self.start_point.as_deref().unwrap_or(&self.parent)
    }

    /// Full branch name for a short name
    pub fn full_name(&self, short_name: &str) -> String {
        format!("{}{}", self.prefix, short_name)
    }

    /// Short name if `full_name` carries this type's prefix
    pub fn short_name<'a>(&self, full_name: &'a str) -> Option<&'a str> {
        full_name.strip_prefix(self.prefix.as_str())
    }
}

/// A long-lived branch in the base-branch tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseBranch {
    /// Branch name, e.g. "develop"
    pub name: String,
    /// Parent base branch, `None` for a root
    pub parent: Option<String>,
    /// How this branch feeds changes back to its parent
    pub upstream_strategy: Strategy,
    /// How this branch receives changes cascaded from its parent
    pub downstream_strategy: Strategy,
}

impl BaseBranch {
    /// A root base branch
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            upstream_strategy: Strategy::Merge,
            downstream_strategy: Strategy::Merge,
        }
    }

    /// A base branch under `parent`
    pub fn child(name: impl Into<String>, parent: impl Into<String>) -> Self {
        Self {
            parent: Some(parent.into()),
            ..Self::root(name)
        }
    }

    /// Set upstream and downstream strategies
    pub fn with_strategies(mut self, upstream: Strategy, downstream: Strategy) -> Self {
        self.upstream_strategy = upstream;
        self.downstream_strategy = downstream;
        self
    }
}

/// What a branch name resolves to in the configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchKind<'a> {
    /// A configured base branch
    Base(&'a BaseBranch),
    /// A topic branch of the given type
    Topic(&'a BranchType),
}

/// Role of a resolved branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityKind {
    /// Base branch
    Base,
    /// Topic branch of the named type
    Topic {
        /// Branch type name
        type_name: String,
    },
}

/// A fully resolved branch reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchIdentity {
    /// Name without the type prefix
    pub short_name: String,
    /// Name as it exists in the repository
    pub full_name: String,
    /// Base or topic
    pub kind: IdentityKind,
}

impl BranchIdentity {
    /// Identity of a topic branch
    pub fn topic(branch_type: &BranchType, short_name: impl Into<String>) -> Self {
        let short_name = short_name.into();
        Self {
            full_name: branch_type.full_name(&short_name),
            short_name,
            kind: IdentityKind::Topic {
                type_name: branch_type.name.clone(),
            },
        }
    }

    /// Identity of a base branch
    pub fn base(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            short_name: name.clone(),
            full_name: name,
            kind: IdentityKind::Base,
        }
    }

    /// Topic type name, `None` for base branches
    pub fn type_name(&self) -> Option<&str> {
        match &self.kind {
            IdentityKind::Topic { type_name } => Some(type_name),
            IdentityKind::Base => None,
        }
    }
}

/// The branch hierarchy loaded for one invocation
///
/// Base branches are kept in an arena in declaration order with a name index
/// and a precomputed child adjacency list.
#[derive(Debug, Clone, Default)]
pub struct BranchConfig {
    bases: Vec<BaseBranch>,
    base_index: HashMap<String, usize>,
    children: Vec<Vec<usize>>,
    types: Vec<BranchType>,
}

impl BranchConfig {
    /// Build the hierarchy from base branches and topic types
    ///
    /// Declaration order is preserved and drives cascade order. Structural
    /// validation (missing parents, cycles) is left to [`BranchConfig::validate`]
    /// and to chain resolution.
    pub fn new(bases: Vec<BaseBranch>, types: Vec<BranchType>) -> Result<Self> {
        let mut base_index = HashMap::new();
        for (idx, base) in bases.iter().enumerate() {
            if base_index.insert(base.name.clone(), idx).is_some() {
                return Err(Error::Config(format!(
                    "Base branch '{}' is configured twice",
                    base.name
                )));
            }
        }

        let mut seen_types = HashSet::new();
        for branch_type in &types {
            if !seen_types.insert(branch_type.name.as_str()) {
                return Err(Error::Config(format!(
                    "Branch type '{}' is configured twice",
                    branch_type.name
                )));
            }
        }

        let mut children = vec![Vec::new(); bases.len()];
        for (idx, base) in bases.iter().enumerate() {
            if let Some(parent_idx) = base.parent.as_ref().and_then(|p| base_index.get(p)) {
                children[*parent_idx].push(idx);
            }
        }

        Ok(Self {
            bases,
            base_index,
            children,
            types,
        })
    }

    /// Check that every chain resolves and every type points at a base branch
    pub fn validate(&self) -> Result<()> {
        if self.bases.is_empty() {
            return Err(Error::Config("No base branches configured".to_string()));
        }

        for base in &self.bases {
            self.resolve_base_branch_chain(&base.name)?;
        }

        for branch_type in &self.types {
            if self.base(&branch_type.parent).is_none() {
                return Err(Error::Config(format!(
                    "Branch type '{}' has parent '{}' which is not a base branch",
                    branch_type.name, branch_type.parent
                )));
            }
            if let Some(start) = &branch_type.start_point {
                if self.base(start).is_none() {
                    return Err(Error::Config(format!(
                        "Branch type '{}' starts from '{}' which is not a base branch",
                        branch_type.name, start
                    )));
                }
            }
        }

        Ok(())
    }

    /// All base branches in declaration order
    pub fn bases(&self) -> &[BaseBranch] {
        &self.bases
    }

    /// All topic branch types in declaration order
    pub fn types(&self) -> &[BranchType] {
        &self.types
    }

    /// Look up a base branch by name
    pub fn base(&self, name: &str) -> Option<&BaseBranch> {
        self.base_index.get(name).map(|idx| &self.bases[*idx])
    }

    /// Look up a topic branch type by name
    pub fn branch_type(&self, name: &str) -> Option<&BranchType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Look up a topic branch type, failing with `UnknownBranchType`
    pub fn require_type(&self, name: &str) -> Result<&BranchType> {
        self.branch_type(name)
            .ok_or_else(|| Error::UnknownBranchType(name.to_string()))
    }

    /// Base branches from the root down to `name`
    pub fn resolve_base_branch_chain(&self, name: &str) -> Result<Vec<&BaseBranch>> {
        let mut chain: Vec<&BaseBranch> = Vec::new();
        let mut visited = HashSet::new();
        let mut current = name;

        loop {
            let base = self.base(current).ok_or_else(|| match chain.last() {
                Some(child) => Error::Config(format!(
                    "Base branch '{}' has parent '{}' which is not configured",
                    child.name, current
                )),
                None => Error::Config(format!("Base branch '{}' is not configured", name)),
            })?;

            if !visited.insert(base.name.as_str()) {
                return Err(Error::Config(format!(
                    "Cycle detected in base branch hierarchy at '{}'",
                    base.name
                )));
            }

            chain.push(base);

            match base.parent.as_deref() {
                Some(parent) if !parent.is_empty() => current = parent,
                _ => break,
            }
        }

        chain.reverse();
        Ok(chain)
    }

    /// Direct children of a base branch, in declaration order
    pub fn children_of(&self, name: &str) -> Vec<&BaseBranch> {
        match self.base_index.get(name) {
            Some(idx) => self.children[*idx].iter().map(|c| &self.bases[*c]).collect(),
            None => Vec::new(),
        }
    }

    /// Classify a full branch name
    ///
    /// Base branches match exactly. Otherwise the topic type with the longest
    /// matching prefix wins; a type with an empty prefix only matches when no
    /// other type does.
    pub fn type_of(&self, full_name: &str) -> Result<BranchKind<'_>> {
        if let Some(base) = self.base(full_name) {
            return Ok(BranchKind::Base(base));
        }

        longest_prefix_match(&self.types, full_name)
            .map(BranchKind::Topic)
            .ok_or_else(|| Error::UnknownBranchType(full_name.to_string()))
    }

    /// Identity for a full branch name
    pub fn identify(&self, full_name: &str) -> Result<BranchIdentity> {
        match self.type_of(full_name)? {
            BranchKind::Base(base) => Ok(BranchIdentity::base(&base.name)),
            BranchKind::Topic(branch_type) => {
                let short = branch_type.short_name(full_name).unwrap_or(full_name);
                Ok(BranchIdentity::topic(branch_type, short))
            }
        }
    }
}

/// Topic type whose prefix is the longest prefix of `full_name`
fn longest_prefix_match<'a>(types: &'a [BranchType], full_name: &str) -> Option<&'a BranchType> {
    types
        .iter()
        .filter(|t| full_name.starts_with(t.prefix.as_str()) && full_name.len() > t.prefix.len())
        .max_by_key(|t| t.prefix.len())
}
