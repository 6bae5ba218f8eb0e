//! Status and config commands - show pending work and the branch layout

use gitflow_core::branch::BaseBranch;
use gitflow_core::workflow::OperationRecord;

use super::Session;

/// Show the pending finish operation, if any
pub fn show_status(session: &Session) -> anyhow::Result<()> {
    let current = session.repo.head_branch()?;

    println!();
    println!(
        "On branch: {}",
        current.as_deref().unwrap_or("(detached HEAD)")
    );

    match session.orchestrator().pending()? {
        None => println!("No finish in progress."),
        Some(record) => print_record(&record),
    }

    println!();
    Ok(())
}

fn print_record(record: &OperationRecord) {
    println!(
        "Finish in progress: {} into {}",
        record.full_branch_name, record.parent_branch
    );
    println!("  Step:     {}", record.current_step.description());
    println!("  Strategy: {}", record.merge_strategy);

    if !record.child_branches.is_empty() {
        println!("  Children:");
        for child in &record.child_branches {
            let done = record.updated_branches.contains(child);
            println!("    [{}] {}", if done { "x" } else { " " }, child);
        }
    }

    if let Some(tag) = &record.options.tag {
        println!("  Tag:      {}", tag.name);
    }

    println!();
    println!("Run 'git flow finish --continue' or 'git flow finish --abort'.");
}

/// Print the branch hierarchy and effective settings
pub fn show_config(session: &Session) {
    let config = &session.config;

    println!();
    println!("Base branches:");
    for base in config.bases() {
        print_base(base);
    }

    println!();
    println!("Branch types:");
    for branch_type in config.types() {
        println!("  {}", branch_type.name);
        println!("    Prefix:      {}", branch_type.prefix);
        println!("    Parent:      {}", branch_type.parent);
        println!("    Starts from: {}", branch_type.start_branch());
        println!(
            "    Strategy:    {} up, {} down",
            branch_type.upstream_strategy, branch_type.downstream_strategy
        );
        if branch_type.tag_enabled {
            println!("    Tag prefix:  {}", branch_type.tag_prefix);
        }
    }

    println!();
    println!("Remote:");
    println!("  Name:  {}", session.settings.remote.name);
    println!("  Fetch: {}", session.settings.remote.fetch);

    if let Some(path) = gitflow_core::Settings::default_config_path() {
        println!();
        println!("Settings file: {}", path.display());
        if !path.exists() {
            println!("  (not present, using defaults)");
        }
    }
    println!();
}

fn print_base(base: &BaseBranch) {
    match &base.parent {
        Some(parent) => println!(
            "  {} <- {} ({} up, {} down)",
            base.name, parent, base.upstream_strategy, base.downstream_strategy
        ),
        None => println!("  {} (root)", base.name),
    }
}
