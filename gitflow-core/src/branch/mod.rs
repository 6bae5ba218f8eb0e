//! Branch hierarchy configuration and name resolution
//!
//! This module provides the typed branch model, its git config storage and the
//! resolver mapping user input to concrete branches.

mod model;
pub mod resolve;
mod source;

pub use model::{
    BaseBranch, BranchConfig, BranchIdentity, BranchKind, BranchType, IdentityKind, Strategy,
};
pub use resolve::{match_short_name, resolve, ShortNameMatch};
pub use source::{Preset, REMOTE_KEY};

pub(crate) use source::get_string as config_string;
