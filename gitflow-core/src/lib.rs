//! git-flow core - branch hierarchy model and finish/update orchestration
//!
//! This crate provides the typed branch configuration, branch name
//! resolution, the git driver and the resumable finish state machine behind
//! the `git-flow` command.

pub mod branch;
pub mod config;
pub mod error;
pub mod git;
pub mod workflow;

pub use branch::{BranchConfig, BranchIdentity, Preset};
pub use config::Settings;
pub use error::{Error, Result};
pub use git::{GitRepo, VcsDriver};
pub use workflow::{FileStateStore, MemoryStateStore, Orchestrator, StateStore};
