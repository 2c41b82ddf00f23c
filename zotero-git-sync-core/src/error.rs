//! Error types for every stage of a sync run.
//!
//! Each stage has its own error kind so callers (and tests) can tell a bad
//! config from a rejected API key from a failed push. [`SyncError`] wraps
//! them for the orchestration layer.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML in '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Missing required config field '{0}'")]
    MissingField(&'static str),

    #[error("Invalid value for config field '{field}': {message}")]
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

/// Errors raised by the Zotero Web API client.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Zotero rejected the API key (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("Zotero resource not found: {resource}")]
    NotFound { resource: String },

    #[error("Zotero API returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request to Zotero failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Malformed Zotero response: {0}")]
    Decode(String),
}

/// Errors raised by git subprocesses.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Failed to launch `git {command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`git {command}` exited with {status}: {output}")]
    CommandFailed {
        command: String,
        status: String,
        output: String,
    },
}

/// Top-level error of a sync run.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed lockfile line {line}: '{content}'")]
    Lockfile { line: usize, content: String },
}

impl SyncError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SyncError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = SyncError> = std::result::Result<T, E>;
