//! Error types for exodus-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from local hashing, walking and config handling.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML parse error on config load, with file path and line context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A destination path could not be normalized.
    #[error("invalid destination path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    /// Not a lowercase SHA-256 hex digest.
    #[error("invalid content key '{0}'")]
    InvalidContentKey(String),

    /// Not a `type/subtype` MIME type.
    #[error("invalid content type '{0}'")]
    InvalidContentType(String),

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// A required setting is neither configured nor given on the command line.
    #[error("no {setting} configured for environment '{env}'")]
    MissingSetting { env: String, setting: &'static str },

    /// Only one half of a client certificate/key pair was supplied.
    #[error("environment '{env}' needs both a client certificate and a key")]
    IncompleteCredentials { env: String },

    /// Directory traversal failure.
    #[error("walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Convenience constructor for [`CoreError::Io`].
pub fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
