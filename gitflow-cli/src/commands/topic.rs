//! Topic branch commands - `git flow <type> <action>`

use clap::{Args, Parser, Subcommand};
use gitflow_core::workflow::{DeleteOptions, StartOptions, UpdateOptions};

use super::{FinishArgs, Session};

/// Commands scoped to one branch type, parsed from the words following the
/// type name
#[derive(Parser, Debug)]
pub struct TopicCli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Remote to use (overrides settings, git config and env)
    #[arg(long, global = true)]
    pub remote: Option<String>,

    #[command(subcommand)]
    command: TopicCommand,

    #[arg(skip)]
    type_name: String,
}

#[derive(Subcommand, Debug)]
enum TopicCommand {
    /// Create a new branch of this type and check it out
    Start(StartArgs),

    /// Merge the branch into its parent and update child branches
    Finish(FinishArgs),

    /// Bring the branch up to date with its parent
    Update(UpdateArgs),

    /// Push the branch to the remote
    Publish(NameArgs),

    /// Delete the branch without finishing it
    Delete(DeleteArgs),

    /// List existing branches of this type
    List,
}

impl TopicCli {
    /// Parse `<type> <action> [args]`, exiting with usage on bad input
    ///
    /// `words` is what followed `git-flow` on the command line, starting with
    /// the branch type.
    pub fn from_words(words: &[String]) -> Self {
        let type_name = words.first().cloned().unwrap_or_default();
        let bin_name = format!("git-flow {}", type_name);
        let args = std::iter::once(bin_name).chain(words.iter().skip(1).cloned());

        let mut cli = Self::try_parse_from(args).unwrap_or_else(|e| e.exit());
        cli.type_name = type_name;
        cli
    }

    /// Execute the topic command
    ///
    /// `remote` is the `--remote` flag given before the type name; one given
    /// after it wins.
    pub fn execute(&self, remote: Option<String>) -> anyhow::Result<()> {
        let session = Session::open(self.remote.clone().or(remote))?;
        session.config.require_type(&self.type_name)?;
        let scope = Some(self.type_name.as_str());

        match &self.command {
            TopicCommand::Start(args) => args.execute(&session, &self.type_name),
            TopicCommand::Finish(args) => args.execute(&session, scope),
            TopicCommand::Update(args) => args.execute(&session, scope),
            TopicCommand::Publish(args) => publish(&session, scope, args),
            TopicCommand::Delete(args) => args.execute(&session, scope),
            TopicCommand::List => list(&session, &self.type_name),
        }
    }
}

/// Start a topic branch
#[derive(Args, Debug)]
pub struct StartArgs {
    /// Branch name, with or without the type prefix
    pub name: String,

    /// Start from this branch instead of the type's start point
    pub base: Option<String>,

    /// Fetch from the remote before starting
    #[arg(long)]
    pub fetch: bool,
}

impl StartArgs {
    pub fn execute(&self, session: &Session, type_name: &str) -> anyhow::Result<()> {
        let options = StartOptions {
            base: self.base.clone(),
            fetch: session.fetch(self.fetch),
        };
        let identity = session
            .orchestrator()
            .start(type_name, &self.name, &options)?;

        println!("Switched to a new branch '{}'", identity.full_name);
        Ok(())
    }
}

/// Update a branch from its parent
#[derive(Args, Debug, Default)]
pub struct UpdateArgs {
    /// Branch name, defaults to the current branch
    pub name: Option<String>,

    /// Rebase instead of the configured strategy
    #[arg(long)]
    pub rebase: bool,

    /// Fetch from the remote before updating
    #[arg(long)]
    pub fetch: bool,
}

impl UpdateArgs {
    pub fn execute(&self, session: &Session, scope: Option<&str>) -> anyhow::Result<()> {
        let options = UpdateOptions {
            rebase: self.rebase,
            fetch: session.fetch(self.fetch).unwrap_or(false),
        };
        let outcome = session
            .orchestrator()
            .update(scope, self.name.as_deref(), options)?;

        println!(
            "Updated {} from {} ({})",
            outcome.branch, outcome.parent, outcome.strategy
        );
        Ok(())
    }
}

/// A single optional branch name
#[derive(Args, Debug, Default)]
pub struct NameArgs {
    /// Branch name, defaults to the current branch
    pub name: Option<String>,
}

/// Delete a topic branch
#[derive(Args, Debug, Default)]
pub struct DeleteArgs {
    /// Branch name, defaults to the current branch
    pub name: Option<String>,

    /// Delete even if the branch is not fully merged
    #[arg(short, long)]
    pub force: bool,

    /// Delete the branch on the remote as well
    #[arg(short = 'r', long)]
    pub deleteremote: bool,
}

impl DeleteArgs {
    pub fn execute(&self, session: &Session, scope: Option<&str>) -> anyhow::Result<()> {
        let options = DeleteOptions {
            force: self.force,
            remote: self.deleteremote.then_some(true),
        };
        let outcome = session
            .orchestrator()
            .delete(scope, self.name.as_deref(), options)?;

        println!("Deleted branch {}", outcome.branch);
        if outcome.deleted_remote {
            println!("Deleted remote branch {}", outcome.branch);
        }
        Ok(())
    }
}

/// Push a topic branch to the remote
pub fn publish(session: &Session, scope: Option<&str>, args: &NameArgs) -> anyhow::Result<()> {
    let orchestrator = session.orchestrator();
    let identity = orchestrator.publish(scope, args.name.as_deref())?;

    println!(
        "Published {} to {}",
        identity.full_name,
        orchestrator.remote()
    );
    Ok(())
}

fn list(session: &Session, type_name: &str) -> anyhow::Result<()> {
    let branches = session.orchestrator().list(type_name)?;

    if branches.is_empty() {
        println!("No {} branches.", type_name);
        return Ok(());
    }

    for branch in &branches {
        let marker = if branch.current { "*" } else { " " };
        println!("{} {}", marker, branch.identity.short_name);
    }
    Ok(())
}
