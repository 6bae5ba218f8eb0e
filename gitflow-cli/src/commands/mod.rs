//! CLI command implementations

pub mod finish;
pub mod init;
pub mod status;
pub mod topic;

pub use finish::FinishArgs;
pub use init::InitArgs;
pub use status::{show_config, show_status};
pub use topic::{publish, DeleteArgs, NameArgs, TopicCli, UpdateArgs};

use gitflow_core::{BranchConfig, FileStateStore, GitRepo, Orchestrator, Settings};

/// Everything a command needs from the repository it runs in
pub struct Session {
    pub repo: GitRepo,
    pub config: BranchConfig,
    pub settings: Settings,
    pub store: FileStateStore,
}

impl Session {
    /// Open the repository containing the working directory
    ///
    /// `remote` is the `--remote` flag, applied on top of the settings file,
    /// `gitflow.origin` and the environment.
    pub fn open(remote: Option<String>) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir()?;
        let repo = GitRepo::open(&cwd)?;
        let config = repo.branch_config()?;
        let settings = Settings::load_with_overrides(repo.configured_remote()?, remote, None)?;
        let store = FileStateStore::for_repo(&repo);

        tracing::debug!(
            root = %repo.root().display(),
            remote = %settings.remote.name,
            "Opened repository"
        );

        Ok(Self {
            repo,
            config,
            settings,
            store,
        })
    }

    pub fn orchestrator(&self) -> Orchestrator<'_> {
        Orchestrator::new(&self.config, &self.repo, &self.store)
            .with_remote(self.settings.remote.name.as_str())
    }

    /// Fetch decision for a command: the flag or the `remote.fetch` setting
    /// force a fetch, otherwise the branch type decides
    pub fn fetch(&self, flag: bool) -> Option<bool> {
        (flag || self.settings.remote.fetch).then_some(true)
    }
}
