//! Process- and framework-wide property tables
//!
//! The backing file of a store is found through two lookups: the store's
//! configuration names a property, and a [`PropertySource`] supplies that
//! property's value, the file path.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// A read-only table of named string properties.
pub trait PropertySource: Send + Sync {
    /// Look up a property by name.
    fn property(&self, name: &str) -> Option<String>;

    /// Look up a property, falling back to `default`.
    fn property_or(&self, name: &str, default: &str) -> String {
        self.property(name).unwrap_or_else(|| default.to_string())
    }
}

impl<S: PropertySource + ?Sized> PropertySource for Arc<S> {
    fn property(&self, name: &str) -> Option<String> {
        (**self).property(name)
    }
}

impl<S: PropertySource + ?Sized> PropertySource for Box<S> {
    fn property(&self, name: &str) -> Option<String> {
        (**self).property(name)
    }
}

impl<S: PropertySource + ?Sized> PropertySource for &S {
    fn property(&self, name: &str) -> Option<String> {
        (**self).property(name)
    }
}

/// Properties of the running process, read from environment variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProperties;

impl PropertySource for SystemProperties {
    fn property(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Framework-level properties with an optional parent to fall back to.
///
/// Values may be updated at runtime; readers observe the latest value on
/// their next lookup.
#[derive(Default)]
pub struct FrameworkProperties {
    values: RwLock<HashMap<String, String>>,
    parent: Option<Box<dyn PropertySource>>,
}

impl FrameworkProperties {
    /// Create an empty table with no fallback.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty table that falls back to `parent` for unset names.
    pub fn with_parent(parent: impl PropertySource + 'static) -> Self {
        Self {
            values: RwLock::default(),
            parent: Some(Box::new(parent)),
        }
    }

    /// Builder form of [`FrameworkProperties::set`].
    pub fn with(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Set a property value.
    pub fn set(&self, name: impl Into<String>, value: impl Into<String>) {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.insert(name.into(), value.into());
    }

    /// Remove a property value, returning the old one.
    pub fn remove(&self, name: &str) -> Option<String> {
        let mut values = self.values.write().unwrap_or_else(|e| e.into_inner());
        values.remove(name)
    }
}

impl PropertySource for FrameworkProperties {
    fn property(&self, name: &str) -> Option<String> {
        let local = {
            let values = self.values.read().unwrap_or_else(|e| e.into_inner());
            values.get(name).cloned()
        };
        local.or_else(|| self.parent.as_ref().and_then(|p| p.property(name)))
    }
}

impl std::fmt::Debug for FrameworkProperties {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let values = self.values.read().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("FrameworkProperties")
            .field("values", &*values)
            .field("has_parent", &self.parent.is_some())
            .finish()
    }
}
