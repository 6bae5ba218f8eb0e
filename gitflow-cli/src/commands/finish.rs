//! Finish command - merge a topic branch, cascade, clean up

use std::path::PathBuf;

use clap::Args;
use gitflow_core::workflow::{AbortOutcome, FinishOptions, FinishOutcome, TagOptions};

use super::Session;

/// Finish a topic branch
#[derive(Args, Debug, Default)]
pub struct FinishArgs {
    /// Branch name (short or prefixed), defaults to the current branch
    pub name: Option<String>,

    /// Resume a finish stopped on conflicts
    #[arg(short = 'c', long = "continue", conflicts_with = "abort")]
    pub continue_: bool,

    /// Abandon a finish stopped on conflicts
    #[arg(short, long)]
    pub abort: bool,

    /// Tag the finished branch
    #[arg(long, conflicts_with = "notag")]
    pub tag: bool,

    /// Do not tag, even if the branch type tags by default
    #[arg(long)]
    pub notag: bool,

    /// Tag name instead of prefix + branch name
    #[arg(short = 'T', long, value_name = "NAME")]
    pub tagname: Option<String>,

    /// Tag message
    #[arg(short, long, conflicts_with = "messagefile")]
    pub message: Option<String>,

    /// Read the tag message from a file
    #[arg(long, value_name = "PATH")]
    pub messagefile: Option<PathBuf>,

    /// Keep the local branch after finishing
    #[arg(short, long)]
    pub keeplocal: bool,

    /// Delete the local branch even if git considers it unmerged
    #[arg(short = 'D', long)]
    pub force_delete: bool,

    /// Delete the branch on the remote as well
    #[arg(short = 'r', long, conflicts_with = "no_deleteremote")]
    pub deleteremote: bool,

    /// Keep the remote branch even if the branch type deletes it by default
    #[arg(long)]
    pub no_deleteremote: bool,

    /// Fetch from the remote before finishing
    #[arg(long)]
    pub fetch: bool,
}

impl FinishArgs {
    /// Execute the finish command
    ///
    /// `scope` is the branch type when invoked as `git flow <type> finish`.
    pub fn execute(&self, session: &Session, scope: Option<&str>) -> anyhow::Result<()> {
        let orchestrator = session.orchestrator();
        let name = self.name.as_deref();

        if self.abort {
            match orchestrator.abort_finish(scope, name)? {
                AbortOutcome::Aborted(record) => {
                    println!(
                        "Aborted finish of {} during {}",
                        record.full_branch_name,
                        record.current_step.description()
                    );
                    println!("Checked out {}", record.full_branch_name);
                }
                AbortOutcome::Discarded { reason } => {
                    eprintln!("Warning: discarded unreadable finish record: {}", reason);
                    println!("Aborted pending merge or rebase, if any");
                }
            }
            return Ok(());
        }

        let result = if self.continue_ {
            orchestrator.continue_finish(scope, name)
        } else {
            orchestrator.finish(scope, name, &self.options(session))
        };

        match result {
            Ok(outcome) => {
                print_outcome(&outcome);
                Ok(())
            }
            Err(err) => {
                if err.is_conflict() {
                    eprintln!("Resolve the conflicts and stage the result, then run:");
                    eprintln!("  git flow finish --continue");
                    eprintln!("or give up with:");
                    eprintln!("  git flow finish --abort");
                    eprintln!();
                }
                Err(err.into())
            }
        }
    }

    fn options(&self, session: &Session) -> FinishOptions {
        FinishOptions {
            tag: TagOptions {
                tag: flag_pair(self.tag, self.notag),
                name: self.tagname.clone(),
                message: self.message.clone(),
                message_file: self.messagefile.clone(),
            },
            keep_local: self.keeplocal.then_some(true),
            force_delete: self.force_delete.then_some(true),
            delete_remote: flag_pair(self.deleteremote, self.no_deleteremote),
            fetch: session.fetch(self.fetch),
        }
    }
}

/// `--x` / `--no-x` pair to an override, `None` when neither was given
fn flag_pair(on: bool, off: bool) -> Option<bool> {
    if off {
        Some(false)
    } else if on {
        Some(true)
    } else {
        None
    }
}

fn print_outcome(outcome: &FinishOutcome) {
    println!("Finished {} into {}", outcome.branch, outcome.parent);

    if let Some(tag) = &outcome.tag {
        println!("  Tagged: {}", tag);
    }

    for child in &outcome.updated_children {
        println!("  Updated: {}", child);
    }

    if outcome.deleted_local {
        println!("  Deleted local branch {}", outcome.branch);
    } else {
        println!("  Kept local branch {}", outcome.branch);
    }

    if outcome.deleted_remote {
        println!("  Deleted remote branch {}", outcome.branch);
    }

    for warning in &outcome.warnings {
        eprintln!("Warning: {}", warning);
    }
}
