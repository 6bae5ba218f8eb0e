//! Init command - write a branch layout into git config

use clap::Args;
use gitflow_core::{GitRepo, Preset, VcsDriver};

/// Initialize git-flow in the current repository
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Branch layout to write: classic, github or gitlab
    #[arg(short, long, default_value = "classic")]
    pub preset: String,

    /// Overwrite an existing layout
    #[arg(short, long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub fn execute(&self) -> anyhow::Result<()> {
        let preset: Preset = self.preset.parse()?;
        let cwd = std::env::current_dir()?;
        let repo = GitRepo::open(&cwd)?;

        if !self.force && repo.branch_config().is_ok() {
            anyhow::bail!(
                "git-flow is already initialized in {}. Use --force to overwrite.",
                repo.root().display()
            );
        }

        let config = preset.hierarchy();
        repo.write_branch_config(&config)?;
        tracing::info!(preset = %self.preset, "Wrote branch layout");

        // Roots come from the current branch, children from their parent
        for base in config.bases() {
            if repo.branch_exists(&base.name)? {
                continue;
            }

            let start = match &base.parent {
                Some(parent) => Some(parent.clone()),
                None => repo.current_branch()?,
            };

            match start {
                Some(start) if repo.branch_exists(&start)? => {
                    repo.create_branch(&base.name, &start)?;
                    println!("Created branch {} from {}", base.name, start);
                }
                _ => {
                    eprintln!(
                        "Warning: cannot create {} yet, commit something first",
                        base.name
                    );
                }
            }
        }

        println!("Initialized git-flow ({} layout)", self.preset.to_lowercase());
        Ok(())
    }
}
