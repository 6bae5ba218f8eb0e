//! git-flow CLI - branching workflow on top of git
//!
//! Topic branch commands take the branch type as the first word:
//! `git flow feature start login`, `git flow release finish 1.2`.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{DeleteArgs, FinishArgs, InitArgs, NameArgs, Session, TopicCli, UpdateArgs};

/// git-flow: branch hierarchy automation for git
#[derive(Parser, Debug)]
#[command(name = "git-flow")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Remote to use (overrides settings, git config and env)
    #[arg(long, global = true)]
    remote: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Write a branch layout into this repository's git config
    Init(InitArgs),

    /// Show the branch hierarchy and settings
    Config,

    /// Show a pending finish operation
    Status,

    /// Finish the current topic branch
    Finish(FinishArgs),

    /// Update a branch from its parent
    Update(UpdateArgs),

    /// Push the current topic branch to the remote
    Publish(NameArgs),

    /// Delete a topic branch
    Delete(DeleteArgs),

    /// Topic branch commands: `<type> start|finish|update|publish|delete|list`
    #[command(external_subcommand)]
    Topic(Vec<String>),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let topic = match &cli.command {
        Some(Commands::Topic(words)) => Some(TopicCli::from_words(words)),
        _ => None,
    };

    init_tracing(cli.verbose || topic.as_ref().is_some_and(|t| t.verbose));

    match run(cli, topic) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Exit code of the core error category, 1 for anything else
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<gitflow_core::Error>()
        .map_or(1, gitflow_core::Error::exit_code)
}

fn run(cli: Cli, topic: Option<TopicCli>) -> anyhow::Result<()> {
    let remote = cli.remote;

    match cli.command {
        Some(Commands::Version) => {
            println!("git-flow {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Init(args)) => {
            args.execute()?;
        }
        Some(Commands::Config) => {
            commands::show_config(&Session::open(remote)?);
        }
        Some(Commands::Status) => {
            commands::show_status(&Session::open(remote)?)?;
        }
        Some(Commands::Finish(args)) => {
            args.execute(&Session::open(remote)?, None)?;
        }
        Some(Commands::Update(args)) => {
            args.execute(&Session::open(remote)?, None)?;
        }
        Some(Commands::Publish(args)) => {
            commands::publish(&Session::open(remote)?, None, &args)?;
        }
        Some(Commands::Delete(args)) => {
            args.execute(&Session::open(remote)?, None)?;
        }
        Some(Commands::Topic(_)) => {
            if let Some(topic) = topic {
                topic.execute(remote)?;
            }
        }
        None => {
            println!("git-flow - branch hierarchy automation for git");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
