//! Shared test utilities for the property store workspace.
//!
//! This crate provides standardised fixtures so crate test suites do not
//! each hand-roll temporary properties files. It is a dev-dependency only.
//!
//! # Modules
//!
//! - [`file`]: [`PropsFile`], a properties file in its own temp directory

pub mod file;

pub use file::PropsFile;
