//! Error types for props-services

use crate::registry::ServiceType;
use std::time::Duration;

/// Result type for props-services operations
pub type Result<T> = std::result::Result<T, Error>;

fn describe_filter(filter: &Option<String>) -> String {
    match filter {
        Some(f) => format!("[{f}]"),
        None => String::new(),
    }
}

/// Errors reported by a [`Registry`](crate::Registry) implementation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Invalid filter [{filter}]: {reason}")]
    InvalidFilter { filter: String, reason: String },

    #[error("Unknown service reference {id}")]
    UnknownReference { id: u64 },

    #[error("Service reference {id} is not in use")]
    NotInUse { id: u64 },

    #[error("Registry unavailable: {message}")]
    Unavailable { message: String },
}

/// Errors that can occur when looking up services
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The lookup was closed
    #[error("Service lookup is disposed")]
    Disposed,

    /// No matching registration right now
    #[error("Service [{service}]{} is not available", describe_filter(.filter))]
    NotFound {
        service: ServiceType,
        filter: Option<String>,
    },

    /// No matching registration appeared before the deadline
    #[error("Service [{service}]{} is not available after {waited:?}", describe_filter(.filter))]
    Timeout {
        service: ServiceType,
        filter: Option<String>,
        waited: Duration,
    },

    /// The registry itself failed
    #[error("Failed accessing service reference [{service}]{}: {source}", describe_filter(.filter))]
    Registry {
        service: ServiceType,
        filter: Option<String>,
        #[source]
        source: RegistryError,
    },

    /// A waiting lookup was interrupted
    #[error("Interrupted while waiting for service [{service}]")]
    Interrupted { service: ServiceType },
}

impl Error {
    /// True when the service is simply not there (yet), as opposed to the
    /// lookup or the registry being broken.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Timeout { .. })
    }
}
