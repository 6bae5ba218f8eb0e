//! Shared helpers for orchestrator integration tests

#![allow(dead_code)]

pub mod fake_vcs;

use gitflow_core::branch::{BaseBranch, BranchConfig, BranchType, Preset, Strategy};

/// main + develop with feature/bugfix/release/hotfix/support
pub fn classic() -> BranchConfig {
    Preset::Classic.hierarchy()
}

/// main with three children receiving the cascade in declaration order
pub fn three_children() -> BranchConfig {
    BranchConfig::new(
        vec![
            BaseBranch::root("main"),
            BaseBranch::child("develop", "main"),
            BaseBranch::child("staging", "main"),
            BaseBranch::child("qa", "main").with_strategies(Strategy::Merge, Strategy::Rebase),
        ],
        vec![BranchType::new("release", "release/", "main").with_tag("v")],
    )
    .unwrap()
}
