//! Git repository detection and read-only queries

use std::path::{Path, PathBuf};

use git2::{BranchType, ConfigLevel, Repository, RepositoryState};

use crate::branch::{config_string, BranchConfig, REMOTE_KEY};
use crate::{Error, Result};

/// Directory under the git dir holding git-flow state
const STATE_DIR: &str = "gitflow/state";

/// A git repository wrapper providing git-flow specific operations
pub struct GitRepo {
    /// The underlying git2 repository
    repo: Repository,
    /// Path to the working tree root
    root: PathBuf,
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl GitRepo {
    /// Open a git repository at the given path
    ///
    /// This will search upward from the given path to find the repository root.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let repo = Repository::discover(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                Error::Config(format!(
                    "Not a git repository: {}. Run 'git init' first or navigate to a git repository.",
                    path.display()
                ))
            } else {
                Error::Git(e.to_string())
            }
        })?;

        let root = repo
            .workdir()
            .ok_or_else(|| Error::Config("Bare repositories are not supported".to_string()))?
            .to_path_buf();

        Ok(Self { repo, root })
    }

    /// Get the repository root path
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the `.git` directory
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Directory holding the persisted operation record
    pub fn state_dir(&self) -> PathBuf {
        self.git_dir().join(STATE_DIR)
    }

    /// Load the branch hierarchy from this repository's git config
    pub fn branch_config(&self) -> Result<BranchConfig> {
        let snapshot = self
            .repo
            .config()
            .and_then(|mut c| c.snapshot())
            .map_err(|e| Error::Config(format!("Failed to open git config: {}", e)))?;
        BranchConfig::from_git_config(&snapshot)
    }

    /// Write a branch hierarchy into the repository-local git config
    pub fn write_branch_config(&self, config: &BranchConfig) -> Result<()> {
        let mut local = self
            .repo
            .config()
            .and_then(|c| c.open_level(ConfigLevel::Local))
            .map_err(|e| Error::Config(format!("Failed to open local git config: {}", e)))?;
        config.write_git_config(&mut local)
    }

    /// Remote name configured under `gitflow.origin`, if any
    pub fn configured_remote(&self) -> Result<Option<String>> {
        let snapshot = self
            .repo
            .config()
            .and_then(|mut c| c.snapshot())
            .map_err(|e| Error::Config(format!("Failed to open git config: {}", e)))?;
        config_string(&snapshot, REMOTE_KEY)
    }

    /// Get the current branch name
    pub fn head_branch(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(Error::Git(format!("Failed to get HEAD: {}", e))),
        };

        if head.is_branch() {
            Ok(head.shorthand().map(|s| s.to_string()))
        } else {
            // Detached HEAD
            Ok(None)
        }
    }

    /// List all local branches
    pub fn list_local_branches(&self) -> Result<Vec<String>> {
        let mut branches = Vec::new();

        for branch in self
            .repo
            .branches(Some(BranchType::Local))
            .map_err(|e| Error::Git(format!("Failed to list branches: {}", e)))?
        {
            let (branch, _) =
                branch.map_err(|e| Error::Git(format!("Failed to read branch: {}", e)))?;
            if let Some(name) = branch.name().ok().flatten() {
                branches.push(name.to_string());
            }
        }

        Ok(branches)
    }

    /// Whether `refs/<namespace>/<name>` exists
    pub(crate) fn reference_exists(&self, reference: &str) -> bool {
        self.repo.find_reference(reference).is_ok()
    }

    /// Whether a merge or rebase is stopped in the working tree
    pub(crate) fn pending_state(&self) -> RepositoryState {
        self.repo.state()
    }

    /// Paths with unmerged index entries
    pub fn conflicted_paths(&self) -> Result<Vec<String>> {
        let mut index = self
            .repo
            .index()
            .map_err(|e| Error::Git(format!("Failed to open index: {}", e)))?;
        index
            .read(true)
            .map_err(|e| Error::Git(format!("Failed to read index: {}", e)))?;

        if !index.has_conflicts() {
            return Ok(Vec::new());
        }

        let mut paths = Vec::new();
        for conflict in index
            .conflicts()
            .map_err(|e| Error::Git(format!("Failed to read conflicts: {}", e)))?
        {
            let conflict =
                conflict.map_err(|e| Error::Git(format!("Failed to read conflict: {}", e)))?;
            let entry = conflict.our.or(conflict.their).or(conflict.ancestor);
            if let Some(entry) = entry {
                paths.push(String::from_utf8_lossy(&entry.path).into_owned());
            }
        }
        paths.sort();
        paths.dedup();

        Ok(paths)
    }
}
