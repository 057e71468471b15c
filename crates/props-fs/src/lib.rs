//! Filesystem layer for the property store
//!
//! Provides locked, atomic file I/O and the flat `key=value` properties
//! codec used as the on-disk format of a property table.

pub mod error;
pub mod format;
pub mod io;

pub use error::{Error, Result};
pub use format::{Properties, parse, serialize};
