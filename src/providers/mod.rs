//! Per-agent format adapters
//!
//! Each adapter translates between [`Fields`] and the agent's own on-disk
//! files, touching only the keys it manages. The [`Registry`] is the only
//! way callers obtain an adapter.

pub mod claude;
pub mod codex;
pub mod gemini;
pub mod registry;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::agent_ids::AgentId;
use crate::error::Result;
use crate::fields::{Fields, Update, validate_fields};
use crate::fs;

pub use claude::ClaudeProvider;
pub use codex::CodexProvider;
pub use gemini::GeminiProvider;
pub use registry::Registry;

// =============================================================================
// Provider Trait
// =============================================================================

/// Read/write adapter for one agent's configuration files.
pub trait Provider: Send + Sync {
    /// The agent this adapter serves.
    fn id(&self) -> AgentId;

    /// Files read and written, in a fixed order.
    fn paths(&self) -> Vec<PathBuf>;

    /// Current values on disk. Absent files yield empty fields, not an error.
    fn read(&self) -> Result<Fields>;

    /// Persist `fields`, backing up every pre-existing target first.
    ///
    /// `model` decides what happens to the model entry; `fields.model` is
    /// ignored here so that "leave it" and "remove it" stay distinct.
    fn write(&self, fields: &Fields, model: &Update<String>) -> Result<Backup>;

    /// Shared validation rule; adapters add no constraints of their own.
    fn validate(&self, fields: &Fields) -> Result<()> {
        validate_fields(fields)
    }

    /// Write `fields` with a non-empty model set and an empty one left alone.
    fn apply(&self, fields: &Fields) -> Result<Backup> {
        self.write(fields, &Update::from_nonempty(fields.model.clone()))
    }
}

// =============================================================================
// Backup Token
// =============================================================================

/// Result of a write: when it happened and which backups it produced.
#[derive(Debug, Clone)]
pub struct Backup {
    pub time: DateTime<Local>,
    /// Original path -> backup copy, for files that existed before the write.
    pub files: BTreeMap<PathBuf, PathBuf>,
}

impl Backup {
    pub fn new() -> Self {
        Self {
            time: Local::now(),
            files: BTreeMap::new(),
        }
    }

    /// Back up `path` (if present) and remember where the copy went.
    pub(crate) fn snapshot(&mut self, path: &Path) -> Result<()> {
        if let Some(copy) = fs::backup_file(path)? {
            self.files.insert(path.to_path_buf(), copy);
        }
        Ok(())
    }
}

impl Default for Backup {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Disk State
// =============================================================================

/// How an agent's configuration looked when inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    MissingFile,
    MissingKey,
    Error(String),
}

impl Status {
    pub fn label(&self) -> &str {
        match self {
            Status::Ok => "OK",
            Status::MissingFile => "MissingFile",
            Status::MissingKey => "MissingKey",
            Status::Error(_) => "Error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiskState {
    pub agent: AgentId,
    pub fields: Fields,
    pub status: Status,
    pub paths: Vec<PathBuf>,
}

/// Read an adapter and classify the outcome instead of failing.
pub fn inspect(provider: &dyn Provider) -> DiskState {
    let paths = provider.paths();
    let (fields, status) = match provider.read() {
        Ok(fields) if !paths.iter().any(|p| p.exists()) => (fields, Status::MissingFile),
        Ok(fields) if fields.url.is_empty() => (fields, Status::MissingKey),
        Ok(fields) => (fields, Status::Ok),
        Err(e) => (Fields::default(), Status::Error(e.to_string())),
    };
    DiskState {
        agent: provider.id(),
        fields,
        status,
        paths,
    }
}

/// Runs the operation. If it fails, runs cleanup/rollback logic before
/// returning the original error.
pub(crate) fn with_rollback<F, C>(f: F, cleanup: C) -> Result<()>
where
    F: FnOnce() -> Result<()>,
    C: FnOnce(),
{
    match f() {
        Ok(()) => Ok(()),
        Err(e) => {
            cleanup();
            Err(e)
        }
    }
}
