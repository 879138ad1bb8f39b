//! Storage layer for taskmirror
//!
//! All state lives in one data directory:
//!
//! ```text
//! <data_dir>/
//!   tasks.jsonl            # Live task list, one wire record per line
//!   local_changes.jsonl    # Unsynced edits, one wire record per line
//!   filters.json           # User filters
//!   *.lock                 # Advisory locks guarding the files above
//! ```
//!
//! Task files hold wire records so a data directory can be inspected or
//! fed to the store's own `import` by hand.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};

use crate::codec::{self, ImportReport};
use crate::error::{Error, Result};
use crate::filter::FilterSet;
use crate::lock::{self, FileLock, DEFAULT_LOCK_TIMEOUT_MS};
use crate::task::Task;

pub const TASKS_FILE: &str = "tasks.jsonl";
pub const LOCAL_CHANGES_FILE: &str = "local_changes.jsonl";
pub const FILTERS_FILE: &str = "filters.json";

/// Platform data directory (e.g. `~/.local/share/taskmirror`).
pub fn default_data_dir() -> Result<PathBuf> {
    ProjectDirs::from("", "", "taskmirror")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| {
            Error::InvalidConfig("could not determine a home directory for data".to_string())
        })
}

/// Storage manager for one data directory
#[derive(Debug, Clone)]
pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn tasks_file(&self) -> PathBuf {
        self.data_dir.join(TASKS_FILE)
    }

    pub fn local_changes_file(&self) -> PathBuf {
        self.data_dir.join(LOCAL_CHANGES_FILE)
    }

    pub fn filters_file(&self) -> PathBuf {
        self.data_dir.join(FILTERS_FILE)
    }

    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }

    // =========================================================================
    // Generic JSON helpers
    // =========================================================================

    /// Write JSON data atomically under the file's lock
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic_locked(path, json.as_bytes(), DEFAULT_LOCK_TIMEOUT_MS)
    }

    /// Read JSON data, or `None` when the file does not exist yet
    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let _lock = FileLock::acquire(lock::lock_path_for(path), DEFAULT_LOCK_TIMEOUT_MS)?;
        let content = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }

    // =========================================================================
    // Task files
    // =========================================================================

    /// Read a task file. Bad lines are skipped and reported, not fatal.
    pub fn read_tasks(&self, path: &Path) -> Result<ImportReport> {
        if !path.exists() {
            return Ok(ImportReport::default());
        }
        let _lock = FileLock::acquire(lock::lock_path_for(path), DEFAULT_LOCK_TIMEOUT_MS)?;
        let content = fs::read_to_string(path)?;
        Ok(codec::import_batch(
            content.lines().filter(|line| !line.trim().is_empty()),
        ))
    }

    /// Replace a task file with one wire record per task.
    pub fn write_tasks(&self, path: &Path, tasks: &[Task]) -> Result<()> {
        let mut buffer = String::new();
        for task in tasks {
            buffer.push_str(&codec::encode_to_string(task));
            buffer.push('\n');
        }
        lock::write_atomic_locked(path, buffer.as_bytes(), DEFAULT_LOCK_TIMEOUT_MS)
    }

    // =========================================================================
    // Filters
    // =========================================================================

    pub fn read_filters(&self) -> Result<FilterSet> {
        Ok(self.read_json(&self.filters_file())?.unwrap_or_default())
    }

    pub fn write_filters(&self, filters: &FilterSet) -> Result<()> {
        self.write_json(&self.filters_file(), filters)
    }
}
