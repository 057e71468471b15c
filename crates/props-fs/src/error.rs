//! Error types for props-fs

use std::path::PathBuf;

/// Result type for props-fs operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in props-fs operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed properties text at line {line}: {message}")]
    Malformed { line: usize, message: String },

    #[error("Lock acquisition failed for {path}")]
    LockFailed { path: PathBuf },
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
