//! Updating a branch from its parent

use super::Orchestrator;
use crate::branch::{resolve, IdentityKind, Strategy};
use crate::{Error, Result};

/// Flags of an update invocation
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Force a rebase regardless of the configured strategy
    pub rebase: bool,
    /// Fetch from the remote first
    pub fetch: bool,
}

/// Result of a completed update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    /// Updated branch
    pub branch: String,
    /// Branch it was updated from
    pub parent: String,
    /// Strategy used
    pub strategy: Strategy,
}

impl Orchestrator<'_> {
    /// Bring a branch up to date with its parent
    ///
    /// Topic branches follow their type's parent and upstream strategy; base
    /// branches follow their base parent and their own downstream strategy.
    /// Conflicts are reported as-is with the working tree left stopped; no
    /// record is written.
    pub fn update(
        &self,
        scope: Option<&str>,
        name: Option<&str>,
        options: UpdateOptions,
    ) -> Result<UpdateOutcome> {
        self.ensure_idle()?;

        let identity = resolve(self.config, self.vcs, scope, name)?;

        let (parent, configured) = match &identity.kind {
            IdentityKind::Topic { .. } => {
                let branch_type = self.topic_type(&identity)?;
                (branch_type.parent.clone(), branch_type.upstream_strategy)
            }
            IdentityKind::Base => {
                let chain = self.config.resolve_base_branch_chain(&identity.full_name)?;
                let base = chain
                    .last()
                    .ok_or_else(|| Error::Config(format!("'{}' is not configured", identity.full_name)))?;
                let parent = base.parent.clone().ok_or_else(|| {
                    Error::Config(format!(
                        "'{}' is a root branch and has no parent to update from",
                        base.name
                    ))
                })?;
                (parent, base.downstream_strategy)
            }
        };

        let strategy = if options.rebase {
            Strategy::Rebase
        } else {
            configured
        };

        self.require_branch(&identity.full_name)?;
        self.require_branch(&parent)?;

        if options.fetch {
            self.vcs.fetch(&self.remote)?;
        }

        tracing::info!(
            branch = %identity.full_name,
            parent = %parent,
            strategy = %strategy,
            "Updating branch"
        );
        self.integrate(&parent, &identity.full_name, strategy)?;

        Ok(UpdateOutcome {
            branch: identity.full_name,
            parent,
            strategy,
        })
    }
}
