//! Error types for props-core

use crate::coerce::PropertyKind;
use std::path::PathBuf;

/// Result type for props-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in props-core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Read or write attempted before the first load
    #[error("Property store is not initialized")]
    NotInitialized,

    /// Reload attempted on a store that was never activated
    #[error("Property store was never activated; no initialization parameters available")]
    NotActivated,

    /// Operation attempted after `dispose`
    #[error("Property store is disposed")]
    Disposed,

    /// Raw value could not be coerced to the requested kind
    #[error("Failed converting property [{name}] value [{value}] to {kind}: {reason}")]
    Conversion {
        name: String,
        value: String,
        kind: PropertyKind,
        reason: String,
    },

    /// No coercion rule exists for the requested kind
    #[error("Unhandled type: {kind}")]
    UnsupportedType { kind: PropertyKind },

    /// Property keys must not be blank
    #[error("Property key is not valid: [{key}]")]
    InvalidKey { key: String },

    /// The table was not loaded from a file, so there is nowhere to write
    #[error("Properties not specified by file, write is not allowed")]
    WriteNotAllowed,

    /// A required activation parameter is absent or blank
    #[error("Missing required parameter '{name}'")]
    MissingParameter { name: String },

    /// The indirection property has no value in the property source
    #[error("Value of '{property}' is not set")]
    IndirectionUnresolved { property: String },

    /// The resolved backing file does not exist
    #[error("File not found [{path}]")]
    BackingFileMissing { path: PathBuf },

    /// Activation parameters could not be parsed
    #[error("Invalid store configuration: {message}")]
    Config { message: String },

    // Transparent wrappers for underlying crate errors
    /// Filesystem or codec error from props-fs
    #[error(transparent)]
    Fs(#[from] props_fs::Error),
}
