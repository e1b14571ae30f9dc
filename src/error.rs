//! Error types shared by the adapters and the preset store.

use std::io;
use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A file exists but its content cannot be parsed.
    #[error("malformed config {}: {reason}", path.display())]
    MalformedConfig { path: PathBuf, reason: String },

    /// Fields or preset values rejected before anything was written.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("preset not found: {0}")]
    NotFound(String),

    #[error("alias already exists: {0}")]
    AliasExists(String),

    #[error("no adapter available for agent: {0}")]
    AdapterUnavailable(String),

    /// Backup or atomic replace failed; the target keeps its previous content.
    #[error("failed to write {}: {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not determine the user's home directory")]
    HomeUnavailable,
}

impl Error {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Error::MalformedConfig {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::WriteFailure {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}
