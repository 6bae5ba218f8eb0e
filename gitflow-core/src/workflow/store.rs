//! Persistence for the in-flight operation record
//!
//! The presence of a record is the only signal that an operation is in
//! progress. [`FileStateStore`] keeps it as JSON under the git directory so it
//! survives process exit; [`MemoryStateStore`] is for embedding and tests.

use std::cell::RefCell;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::record::OperationRecord;
use crate::git::GitRepo;
use crate::{Error, Result};

/// File name of the persisted record
const STATE_FILE: &str = "merge.json";

/// Storage for at most one operation record per repository
pub trait StateStore {
    /// Replace the stored record
    fn save(&self, record: &OperationRecord) -> Result<()>;

    /// The stored record, if any
    fn load(&self) -> Result<Option<OperationRecord>>;

    /// Remove the stored record; a missing record is not an error
    fn clear(&self) -> Result<()>;

    /// Whether an operation is in progress
    fn in_progress(&self) -> Result<bool> {
        Ok(self.load()?.is_some())
    }
}

/// JSON file store at `<git-dir>/gitflow/state/merge.json`
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Store backed by an explicit file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store for a repository
    pub fn for_repo(repo: &GitRepo) -> Self {
        Self::new(repo.state_dir().join(STATE_FILE))
    }

    /// Path of the record file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

fn persistence_err(what: &str, path: &Path, e: impl std::fmt::Display) -> Error {
    Error::Persistence(format!("Failed to {} {}: {}", what, path.display(), e))
}

impl StateStore for FileStateStore {
    fn save(&self, record: &OperationRecord) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| persistence_err("create", dir, e))?;
        }

        let contents = serde_json::to_string_pretty(record)
            .map_err(|e| Error::Persistence(format!("Failed to serialize operation record: {}", e)))?;

        // Write-then-rename so readers never see a partial record
        let temp = self.temp_path();
        fs::write(&temp, contents).map_err(|e| persistence_err("write", &temp, e))?;
        fs::rename(&temp, &self.path).map_err(|e| persistence_err("replace", &self.path, e))?;

        tracing::debug!(
            path = %self.path.display(),
            step = ?record.current_step,
            "Saved operation record"
        );
        Ok(())
    }

    fn load(&self) -> Result<Option<OperationRecord>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(persistence_err("read", &self.path, e)),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| persistence_err("parse", &self.path, e))
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Cleared operation record");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(persistence_err("remove", &self.path, e)),
        }
    }

    fn in_progress(&self) -> Result<bool> {
        Ok(self.path.exists())
    }
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    record: RefCell<Option<OperationRecord>>,
}

impl MemoryStateStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn save(&self, record: &OperationRecord) -> Result<()> {
        *self.record.borrow_mut() = Some(record.clone());
        Ok(())
    }

    fn load(&self) -> Result<Option<OperationRecord>> {
        Ok(self.record.borrow().clone())
    }

    fn clear(&self) -> Result<()> {
        self.record.borrow_mut().take();
        Ok(())
    }
}
