//! Loading and writing the branch hierarchy in git config
//!
//! Layout:
//!
//! ```text
//! gitflow.branch.<name>.type                = base | topic
//! gitflow.branch.<name>.parent              = <base branch>
//! gitflow.branch.<name>.startpoint          = <base branch>       (topic)
//! gitflow.branch.<name>.prefix              = feature/            (topic)
//! gitflow.branch.<name>.upstreamstrategy    = merge | rebase
//! gitflow.branch.<name>.downstreamstrategy  = merge | rebase
//! gitflow.branch.<name>.tag                 = bool                (topic)
//! gitflow.branch.<name>.tagprefix           = v                   (topic)
//! gitflow.branch.<name>.deleteremote        = bool                (topic)
//! gitflow.<type>.start.fetch                = bool
//! gitflow.<type>.finish.{fetch,notag,keep,force-delete}  = bool
//! gitflow.<type>.finish.messagefile         = path
//! ```

use std::fmt;
use std::str::FromStr;

use git2::{Config as GitConfig, ErrorCode};

use super::model::{BaseBranch, BranchConfig, BranchType, Strategy};
use crate::{Error, Result};

const TYPE_KEY_PATTERN: &str = r"^gitflow\.branch\..*\.type$";
const BRANCH_KEY_PATTERN: &str = r"^gitflow\.branch\.";
const BRANCH_SECTION: &str = "gitflow.branch.";

/// Key under which the remote name is stored
pub const REMOTE_KEY: &str = "gitflow.origin";

impl BranchConfig {
    /// Load the hierarchy from a git config snapshot
    ///
    /// Branches are kept in the order their `type` keys appear in the config
    /// files, which makes cascade order follow declaration order.
    pub fn from_git_config(git: &GitConfig) -> Result<Self> {
        let mut declared: Vec<(String, String)> = Vec::new();

        let mut entries = git.entries(Some(TYPE_KEY_PATTERN)).map_err(config_err)?;
        while let Some(entry) = entries.next() {
            let entry = entry.map_err(config_err)?;
            let (Some(key), Some(value)) = (entry.name(), entry.value()) else {
                continue;
            };
            let Some(name) = key
                .strip_prefix(BRANCH_SECTION)
                .and_then(|rest| rest.strip_suffix(".type"))
            else {
                continue;
            };
            // Later config levels override earlier ones without changing order
            if let Some(existing) = declared.iter_mut().find(|(n, _)| n == name) {
                existing.1 = value.to_string();
            } else {
                declared.push((name.to_string(), value.to_string()));
            }
        }

        if declared.is_empty() {
            return Err(Error::Config(
                "git-flow is not initialized in this repository. Run 'git-flow init' first."
                    .to_string(),
            ));
        }

        let mut bases = Vec::new();
        let mut types = Vec::new();

        for (name, kind) in declared {
            match kind.trim().to_ascii_lowercase().as_str() {
                "base" => bases.push(read_base(git, &name)?),
                "topic" => types.push(read_topic(git, &name)?),
                other => {
                    return Err(Error::Config(format!(
                        "Branch '{}' has unknown type '{}', expected 'base' or 'topic'",
                        name, other
                    )))
                }
            }
        }

        tracing::debug!(
            bases = bases.len(),
            types = types.len(),
            "Loaded branch configuration"
        );

        let config = BranchConfig::new(bases, types)?;
        config.validate()?;
        Ok(config)
    }

    /// Write the hierarchy into a (writable) git config
    ///
    /// Existing `gitflow.branch.*` keys are replaced.
    pub fn write_git_config(&self, git: &mut GitConfig) -> Result<()> {
        let mut stale = Vec::new();
        {
            let mut entries = git.entries(Some(BRANCH_KEY_PATTERN)).map_err(config_err)?;
            while let Some(entry) = entries.next() {
                let entry = entry.map_err(config_err)?;
                if let Some(name) = entry.name() {
                    stale.push(name.to_string());
                }
            }
        }
        stale.sort();
        stale.dedup();
        for name in &stale {
            git.remove_multivar(name, ".*").map_err(config_err)?;
        }

        for base in self.bases() {
            let key = |field: &str| format!("{}{}.{}", BRANCH_SECTION, base.name, field);
            git.set_str(&key("type"), "base").map_err(config_err)?;
            if let Some(parent) = &base.parent {
                git.set_str(&key("parent"), parent).map_err(config_err)?;
            }
            git.set_str(&key("upstreamstrategy"), base.upstream_strategy.as_str())
                .map_err(config_err)?;
            git.set_str(&key("downstreamstrategy"), base.downstream_strategy.as_str())
                .map_err(config_err)?;
        }

        for t in self.types() {
            let key = |field: &str| format!("{}{}.{}", BRANCH_SECTION, t.name, field);
            git.set_str(&key("type"), "topic").map_err(config_err)?;
            git.set_str(&key("parent"), &t.parent).map_err(config_err)?;
            if let Some(start) = &t.start_point {
                git.set_str(&key("startpoint"), start).map_err(config_err)?;
            }
            git.set_str(&key("prefix"), &t.prefix).map_err(config_err)?;
            git.set_str(&key("upstreamstrategy"), t.upstream_strategy.as_str())
                .map_err(config_err)?;
            git.set_str(&key("downstreamstrategy"), t.downstream_strategy.as_str())
                .map_err(config_err)?;
            git.set_bool(&key("tag"), t.tag_enabled).map_err(config_err)?;
            if !t.tag_prefix.is_empty() {
                git.set_str(&key("tagprefix"), &t.tag_prefix).map_err(config_err)?;
            }
            git.set_bool(&key("deleteremote"), t.delete_remote_default)
                .map_err(config_err)?;

            let opt = |path: &str| format!("gitflow.{}.{}", t.name, path);
            for (path, enabled) in [
                ("start.fetch", t.fetch_on_start),
                ("finish.fetch", t.fetch_on_finish),
                ("finish.notag", t.finish_notag),
                ("finish.keep", t.finish_keep_local),
                ("finish.force-delete", t.finish_force_delete),
            ] {
                if enabled {
                    git.set_bool(&opt(path), true).map_err(config_err)?;
                }
            }
            if let Some(file) = &t.finish_message_file {
                git.set_str(&opt("finish.messagefile"), file).map_err(config_err)?;
            }
        }

        Ok(())
    }
}

fn read_base(git: &GitConfig, name: &str) -> Result<BaseBranch> {
    let key = |field: &str| format!("{}{}.{}", BRANCH_SECTION, name, field);
    Ok(BaseBranch {
        name: name.to_string(),
        parent: get_string(git, &key("parent"))?.filter(|p| !p.is_empty()),
        upstream_strategy: get_strategy(git, &key("upstreamstrategy"))?,
        downstream_strategy: get_strategy(git, &key("downstreamstrategy"))?,
    })
}

fn read_topic(git: &GitConfig, name: &str) -> Result<BranchType> {
    let key = |field: &str| format!("{}{}.{}", BRANCH_SECTION, name, field);
    let opt = |path: &str| format!("gitflow.{}.{}", name, path);

    let parent = get_string(git, &key("parent"))?.ok_or_else(|| {
        Error::Config(format!("Topic branch type '{}' has no parent configured", name))
    })?;

    Ok(BranchType {
        name: name.to_string(),
        prefix: get_string(git, &key("prefix"))?.unwrap_or_else(|| format!("{}/", name)),
        parent,
        start_point: get_string(git, &key("startpoint"))?.filter(|s| !s.is_empty()),
        upstream_strategy: get_strategy(git, &key("upstreamstrategy"))?,
        downstream_strategy: get_strategy(git, &key("downstreamstrategy"))?,
        tag_enabled: get_bool(git, &key("tag"))?.unwrap_or(false),
        tag_prefix: get_string(git, &key("tagprefix"))?.unwrap_or_default(),
        delete_remote_default: get_bool(git, &key("deleteremote"))?.unwrap_or(false),
        fetch_on_start: get_bool(git, &opt("start.fetch"))?.unwrap_or(false),
        fetch_on_finish: get_bool(git, &opt("finish.fetch"))?.unwrap_or(false),
        finish_notag: get_bool(git, &opt("finish.notag"))?.unwrap_or(false),
        finish_keep_local: get_bool(git, &opt("finish.keep"))?.unwrap_or(false),
        finish_force_delete: get_bool(git, &opt("finish.force-delete"))?.unwrap_or(false),
        finish_message_file: get_string(git, &opt("finish.messagefile"))?,
    })
}

/// Read a string value, `None` when unset
pub(crate) fn get_string(git: &GitConfig, key: &str) -> Result<Option<String>> {
    match git.get_string(key) {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(config_err(e)),
    }
}

fn get_bool(git: &GitConfig, key: &str) -> Result<Option<bool>> {
    match git.get_bool(key) {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
        Err(e) => Err(Error::Config(format!("Invalid boolean for {}: {}", key, e))),
    }
}

fn get_strategy(git: &GitConfig, key: &str) -> Result<Strategy> {
    get_string(git, key)?
        .map(|s| s.parse())
        .transpose()
        .map(Option::unwrap_or_default)
}

fn config_err(e: git2::Error) -> Error {
    Error::Config(format!("Failed to read git config: {}", e))
}

/// Built-in branch layouts written by `init`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Preset {
    /// main + develop with feature/bugfix/release/hotfix/support
    #[default]
    Classic,
    /// main only with feature branches
    GitHub,
    /// production → staging → main with feature and hotfix branches
    GitLab,
}

impl Preset {
    /// Hierarchy described by this preset
    pub fn hierarchy(&self) -> BranchConfig {
        let (bases, types) = match self {
            Preset::Classic => (
                vec![
                    BaseBranch::root("main"),
                    BaseBranch::child("develop", "main"),
                ],
                vec![
                    BranchType::new("feature", "feature/", "develop")
                        .with_strategies(Strategy::Merge, Strategy::Rebase),
                    BranchType::new("bugfix", "bugfix/", "develop")
                        .with_strategies(Strategy::Merge, Strategy::Rebase),
                    BranchType::new("release", "release/", "main")
                        .with_start_point("develop")
                        .with_tag("v"),
                    BranchType::new("hotfix", "hotfix/", "main").with_tag("v"),
                    BranchType::new("support", "support/", "main"),
                ],
            ),
            Preset::GitHub => (
                vec![BaseBranch::root("main")],
                vec![BranchType::new("feature", "feature/", "main")
                    .with_strategies(Strategy::Merge, Strategy::Rebase)],
            ),
            Preset::GitLab => (
                vec![
                    BaseBranch::root("production"),
                    BaseBranch::child("staging", "production"),
                    BaseBranch::child("main", "staging"),
                ],
                vec![
                    BranchType::new("feature", "feature/", "main")
                        .with_strategies(Strategy::Merge, Strategy::Rebase),
                    BranchType::new("hotfix", "hotfix/", "production").with_tag("v"),
                ],
            ),
        };

        // Preset tables are static and well-formed
        BranchConfig::new(bases, types).unwrap_or_default()
    }
}

impl FromStr for Preset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "classic" => Ok(Preset::Classic),
            "github" => Ok(Preset::GitHub),
            "gitlab" => Ok(Preset::GitLab),
            other => Err(Error::Config(format!(
                "Unknown preset '{}', expected classic, github or gitlab",
                other
            ))),
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Preset::Classic => "classic",
            Preset::GitHub => "github",
            Preset::GitLab => "gitlab",
        };
        f.write_str(name)
    }
}
