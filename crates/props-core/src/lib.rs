//! Typed configuration properties backed by a properties file
//!
//! This crate provides:
//!
//! - **PropertyStore**: a string-keyed table loaded from a file, with typed
//!   reads, reload, and mutations that are written straight back to disk
//! - **Coercion**: a closed set of target kinds ([`PropertyKind`]) and the
//!   rules for turning a raw string into each
//! - **Indirection**: the backing file path is the value of a property named
//!   in the store's [`StoreConfig`], looked up in a [`PropertySource`]
//!
//! # Example
//!
//! ```ignore
//! use props_core::{ConfigurationPropertiesExt, FrameworkProperties, PropertyStore, StoreConfig};
//!
//! let framework = FrameworkProperties::new().with("app.config.file", "/etc/app.properties");
//! let store = PropertyStore::activated(StoreConfig::new("app.config.file"), framework);
//!
//! let port: u16 = store.get_or("server.port", 8080);
//! store.set_one("server.port", Some("9090"))?;
//! ```

pub mod api;
pub mod coerce;
pub mod config;
pub mod error;
pub mod logging;
pub mod source;
pub mod store;
pub mod uri;

pub use api::{ConfigurationProperties, ConfigurationPropertiesExt};
pub use coerce::{FromProperty, PropertyKind, PropertyValue, coerce, parse_bool};
pub use config::{PROP_FILE, StoreConfig};
pub use error::{Error, Result};
pub use source::{FrameworkProperties, PropertySource, SystemProperties};
pub use store::{LoadOutcome, PropertyStore};
pub use uri::{Uri, UriError};
