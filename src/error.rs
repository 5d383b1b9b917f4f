//! Unified error type for the analyzer.

use std::path::PathBuf;

use thiserror::Error;

/// All errors the analyzer's fallible outer operations can produce.
///
/// Document validation itself never returns an error: per-element failures
/// are converted into diagnostics and the walk continues.
#[derive(Error, Debug)]
pub enum SkinError {
    /// I/O error (file read, directory access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// repo.json could not be parsed
    #[error("Invalid repository configuration {path}: {source}")]
    InvalidConfig {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No repo.json found walking up from the given directory
    #[error("No repository root (repo.json) found above {0}")]
    RepoNotFound(PathBuf),

    /// The class-model file is missing or unreadable
    #[error("Class model could not be loaded from {path}: {message}")]
    ClassModelUnavailable { path: PathBuf, message: String },

    /// An `<External name="..."/>` pattern produced an invalid regex
    #[error("Invalid external pattern '{pattern}': {source}")]
    InvalidExternalPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// Directory does not exist
    #[error("Directory does not exist: {0}")]
    DirNotFound(String),

    /// File watcher failure
    #[error("File watcher error: {0}")]
    Watch(String),

    /// Mutually exclusive flags or other argument validation error
    #[error("{0}")]
    InvalidArgs(String),
}
