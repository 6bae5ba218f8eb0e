//! Tag decision for finished topic branches

use std::fs;
use std::path::{Path, PathBuf};

use super::record::TagSpec;
use crate::branch::BranchType;
use crate::{Error, Result};

/// Tag-related finish flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagOptions {
    /// `Some(true)` for `--tag`, `Some(false)` for `--notag`
    pub tag: Option<bool>,
    /// `--tagname`
    pub name: Option<String>,
    /// `--message`
    pub message: Option<String>,
    /// `--messagefile`
    pub message_file: Option<PathBuf>,
}

/// Tag policy of one branch type under one set of flags
#[derive(Debug, Clone, Copy)]
pub struct TagPolicy<'a> {
    branch_type: &'a BranchType,
    options: &'a TagOptions,
}

impl<'a> TagPolicy<'a> {
    pub fn new(branch_type: &'a BranchType, options: &'a TagOptions) -> Self {
        Self {
            branch_type,
            options,
        }
    }

    /// Whether finishing creates a tag
    ///
    /// Disabling (flag or `finish.notag`) always wins; otherwise an explicit
    /// `--tag` or the type's `tag` setting turns it on.
    pub fn enabled(&self) -> bool {
        if self.options.tag == Some(false) || self.branch_type.finish_notag {
            return false;
        }
        self.options.tag == Some(true) || self.branch_type.tag_enabled
    }

    /// Tag name for a short branch name
    pub fn name(&self, short_name: &str) -> String {
        match &self.options.name {
            Some(name) => name.clone(),
            None => format!("{}{}", self.branch_type.tag_prefix, short_name),
        }
    }

    /// Annotation message
    pub fn message(&self) -> Result<String> {
        if let Some(message) = &self.options.message {
            return Ok(message.clone());
        }

        let file = self
            .options
            .message_file
            .as_deref()
            .or(self.branch_type.finish_message_file.as_deref().map(Path::new));

        match file {
            Some(path) => read_message_file(path),
            None => Ok(String::new()),
        }
    }

    /// Tag to create, or `None` when tagging is off
    pub fn plan(&self, short_name: &str) -> Result<Option<TagSpec>> {
        if !self.enabled() {
            return Ok(None);
        }

        Ok(Some(TagSpec {
            name: self.name(short_name),
            message: self.message()?,
        }))
    }
}

fn read_message_file(path: &Path) -> Result<String> {
    let contents = fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "Failed to read tag message file {}: {}",
            path.display(),
            e
        ))
    })?;
    Ok(contents.trim_end().to_string())
}
