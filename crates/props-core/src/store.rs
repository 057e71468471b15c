//! File-backed property store
//!
//! A [`PropertyStore`] holds a string-keyed table loaded from a properties
//! file, answers typed reads through [`ConfigurationProperties`], and
//! writes every mutation back to the same file.

use crate::api::ConfigurationProperties;
use crate::coerce::{PropertyKind, PropertyValue, coerce};
use crate::config::StoreConfig;
use crate::source::PropertySource;
use crate::{Error, Result};
use props_fs::{Properties, format, io};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Result of a load that never fails the caller.
#[derive(Debug)]
pub enum LoadOutcome {
    /// The file was read; carries the number of properties loaded.
    Loaded(usize),
    /// Loading failed and the store now holds an empty table.
    Degraded(Error),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }
}

#[derive(Debug)]
enum State {
    Unloaded,
    Loaded {
        properties: Properties,
        backing_path: Option<PathBuf>,
    },
    Disposed,
}

#[derive(Debug)]
struct Inner {
    state: State,
    activated: bool,
}

/// Typed configuration properties backed by a file.
///
/// All access to the table and backing path goes through one lock, so a
/// reader sees either the whole table before a reload or the whole table
/// after it. No transaction spans several calls.
pub struct PropertyStore {
    config: StoreConfig,
    source: Box<dyn PropertySource>,
    inner: Mutex<Inner>,
}

impl PropertyStore {
    /// Create an empty, unloaded store.
    ///
    /// `source` answers the second indirection lookup: the value of
    /// `config.file_property_name`.
    pub fn new(config: StoreConfig, source: impl PropertySource + 'static) -> Self {
        Self {
            config,
            source: Box::new(source),
            inner: Mutex::new(Inner {
                state: State::Unloaded,
                activated: false,
            }),
        }
    }

    /// Create a store and activate it immediately.
    pub fn activated(config: StoreConfig, source: impl PropertySource + 'static) -> Self {
        let store = Self::new(config, source);
        store.activate();
        store
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Resolve the backing file and load it.
    ///
    /// Failures leave the store usable but empty; see [`PropertyStore::load`].
    pub fn activate(&self) -> LoadOutcome {
        self.lock().activated = true;
        self.load_resolved()
    }

    /// Re-resolve the backing file and load it again.
    ///
    /// Picks up edits made to the file outside this store.
    pub fn reload(&self) -> Result<LoadOutcome> {
        {
            let inner = self.lock();
            if matches!(inner.state, State::Disposed) {
                return Err(Error::Disposed);
            }
            if !inner.activated {
                return Err(Error::NotActivated);
            }
        }
        Ok(self.load_resolved())
    }

    fn resolve_path(&self) -> Result<PathBuf> {
        let name = &self.config.file_property_name;
        let value = self
            .source
            .property(name)
            .ok_or_else(|| Error::IndirectionUnresolved {
                property: name.clone(),
            })?;
        let path = PathBuf::from(value);
        if !path.is_file() {
            return Err(Error::BackingFileMissing { path });
        }
        Ok(path)
    }

    fn load_resolved(&self) -> LoadOutcome {
        match self.resolve_path() {
            Ok(path) => self.load(&path),
            Err(e) => self.degrade(e),
        }
    }

    /// Read `path` in full and make it the backing file.
    ///
    /// The file is read and parsed before the lock is taken; the table and
    /// backing path are then swapped in one step. On any failure the
    /// failure is logged and the table becomes empty, keeping the previous
    /// backing path. This never fails the caller.
    pub fn load(&self, path: &Path) -> LoadOutcome {
        tracing::info!(path = %path.display(), "Loading properties file");

        let parsed = io::read_text(path).and_then(|text| format::parse(&text));
        let properties = match parsed {
            Ok(properties) => properties,
            Err(e) => return self.degrade(e.into()),
        };

        let count = properties.len();
        let mut inner = self.lock();
        if matches!(inner.state, State::Disposed) {
            return LoadOutcome::Degraded(Error::Disposed);
        }
        inner.state = State::Loaded {
            properties,
            backing_path: Some(path.to_path_buf()),
        };
        tracing::info!(count, path = %path.display(), "Loaded properties");
        LoadOutcome::Loaded(count)
    }

    fn degrade(&self, error: Error) -> LoadOutcome {
        tracing::error!(error = %error, "Failed loading properties");
        let mut guard = self.lock();
        let inner = &mut *guard;
        match inner.state {
            State::Disposed => return LoadOutcome::Degraded(Error::Disposed),
            State::Loaded {
                ref mut properties, ..
            } => properties.clear(),
            State::Unloaded => {
                inner.state = State::Loaded {
                    properties: Properties::new(),
                    backing_path: None,
                }
            }
        }
        LoadOutcome::Degraded(error)
    }

    /// Drop the table. Every later read or write fails with [`Error::Disposed`].
    pub fn dispose(&self) {
        self.lock().state = State::Disposed;
    }

    /// The raw string value of `name`.
    pub fn raw(&self, name: &str) -> Result<Option<String>> {
        let inner = self.lock();
        match &inner.state {
            State::Unloaded => Err(Error::NotInitialized),
            State::Disposed => Err(Error::Disposed),
            State::Loaded { properties, .. } => Ok(properties.get(name).cloned()),
        }
    }

    /// The file this store persists to, once one has loaded.
    pub fn backing_path(&self) -> Option<PathBuf> {
        match &self.lock().state {
            State::Loaded { backing_path, .. } => backing_path.clone(),
            _ => None,
        }
    }

    /// An owned copy of every key and raw value.
    pub fn snapshot(&self) -> Result<BTreeMap<String, String>> {
        let inner = self.lock();
        match &inner.state {
            State::Unloaded => Err(Error::NotInitialized),
            State::Disposed => Err(Error::Disposed),
            State::Loaded { properties, .. } => Ok(properties.clone()),
        }
    }

    /// Set or delete one property and persist the table.
    ///
    /// A `None` or blank value deletes the key.
    pub fn set_one(&self, key: &str, value: Option<&str>) -> Result<()> {
        self.set_many([(key, value)])
    }

    /// Set or delete several properties with a single write.
    ///
    /// Each entry follows the rule of [`PropertyStore::set_one`]. A blank
    /// key rejects the whole batch before anything changes.
    pub fn set_many<'a, I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let entries: Vec<_> = entries.into_iter().collect();
        if let Some((key, _)) = entries.iter().find(|(k, _)| k.trim().is_empty()) {
            return Err(Error::InvalidKey {
                key: key.to_string(),
            });
        }

        self.mutate(|properties| {
            for (key, value) in entries {
                match value.filter(|v| !v.trim().is_empty()) {
                    Some(v) => {
                        properties.insert(key.to_string(), v.to_string());
                    }
                    None => {
                        properties.remove(key);
                    }
                }
            }
        })
    }

    /// Replace the entire table and persist it.
    pub fn replace_all(&self, table: BTreeMap<String, String>) -> Result<()> {
        if let Some(key) = table.keys().find(|k| k.trim().is_empty()) {
            return Err(Error::InvalidKey { key: key.clone() });
        }
        self.mutate(move |properties| *properties = table)
    }

    /// Apply `change` under the lock, then rewrite the backing file.
    ///
    /// A failed write is logged and the in-memory change is kept.
    fn mutate(&self, change: impl FnOnce(&mut Properties)) -> Result<()> {
        let mut inner = self.lock();
        let (properties, path) = match &mut inner.state {
            State::Unloaded => return Err(Error::NotInitialized),
            State::Disposed => return Err(Error::Disposed),
            State::Loaded {
                backing_path: None, ..
            } => return Err(Error::WriteNotAllowed),
            State::Loaded {
                properties,
                backing_path: Some(path),
            } => (properties, path),
        };

        change(properties);

        tracing::info!(path = %path.display(), "Writing properties file");
        let text = format::serialize(properties, None);
        if let Err(e) = io::write_text(path, &text) {
            tracing::error!(path = %path.display(), error = %e, "Failed writing properties file");
        }
        Ok(())
    }
}

impl ConfigurationProperties for PropertyStore {
    fn property_value(&self, name: &str, kind: PropertyKind) -> Result<Option<PropertyValue>> {
        // Copy the raw value out so coercion runs without the lock
        match self.raw(name)? {
            None => Ok(None),
            Some(raw) => coerce(name, &raw, kind).map(Some),
        }
    }
}

impl std::fmt::Debug for PropertyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyStore")
            .field("config", &self.config)
            .field("inner", &*self.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ConfigurationPropertiesExt;
    use crate::source::FrameworkProperties;
    use std::fs;
    use tempfile::TempDir;

    const FILE_PROP: &str = "test.config.file";

    fn store_with(contents: &str) -> (TempDir, PropertyStore) {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("app.properties");
        fs::write(&file, contents).unwrap();
        let source = FrameworkProperties::new().with(FILE_PROP, file.to_string_lossy());
        let store = PropertyStore::new(StoreConfig::new(FILE_PROP), source);
        (temp, store)
    }

    #[test]
    fn read_before_load_fails() {
        let (_temp, store) = store_with("a=1");
        assert!(matches!(store.get::<String>("a"), Err(Error::NotInitialized)));
        assert!(matches!(store.snapshot(), Err(Error::NotInitialized)));
    }

    #[test]
    fn reload_before_activate_fails() {
        let (_temp, store) = store_with("a=1");
        assert!(matches!(store.reload(), Err(Error::NotActivated)));
    }

    #[test]
    fn activate_loads_through_indirection() {
        let (_temp, store) = store_with("a=1\nb=two\n");
        assert!(store.activate().is_loaded());
        assert_eq!(store.get::<i32>("a").unwrap(), Some(1));
        assert_eq!(store.get::<String>("b").unwrap().as_deref(), Some("two"));
        assert!(store.backing_path().is_some());
    }

    #[test]
    fn unresolved_indirection_degrades_to_empty() {
        let store = PropertyStore::new(StoreConfig::new("unset.property"), FrameworkProperties::new());
        let outcome = store.activate();
        assert!(matches!(outcome, LoadOutcome::Degraded(Error::IndirectionUnresolved { .. })));
        assert!(store.snapshot().unwrap().is_empty());
        assert_eq!(store.get::<String>("a").unwrap(), None);
    }

    #[test]
    fn writes_without_backing_file_are_refused() {
        let store = PropertyStore::new(StoreConfig::new("unset.property"), FrameworkProperties::new());
        store.activate();
        assert!(matches!(store.set_one("a", Some("1")), Err(Error::WriteNotAllowed)));
    }

    #[test]
    fn failed_reload_empties_table_but_keeps_backing_path() {
        let (temp, store) = store_with("a=1");
        store.activate();
        let path = store.backing_path().unwrap();

        fs::remove_file(temp.path().join("app.properties")).unwrap();
        let outcome = store.reload().unwrap();
        assert!(matches!(outcome, LoadOutcome::Degraded(Error::BackingFileMissing { .. })));
        assert!(store.snapshot().unwrap().is_empty());
        assert_eq!(store.backing_path(), Some(path));
    }

    #[test]
    fn dispose_makes_reads_and_writes_fail() {
        let (_temp, store) = store_with("a=1");
        store.activate();
        store.dispose();

        assert!(matches!(store.get::<String>("a"), Err(Error::Disposed)));
        assert!(matches!(store.set_one("a", Some("2")), Err(Error::Disposed)));
        assert!(matches!(store.reload(), Err(Error::Disposed)));
        assert_eq!(store.get_or("a", "fallback".to_string()), "fallback");
    }

    #[test]
    fn blank_key_is_rejected_before_mutation() {
        let (_temp, store) = store_with("a=1");
        store.activate();
        let err = store.set_many([("b", Some("2")), ("  ", Some("x"))]).unwrap_err();
        assert!(matches!(err, Error::InvalidKey { .. }));
        assert_eq!(store.get::<String>("b").unwrap(), None);
    }

    #[test]
    fn blank_value_deletes() {
        let (_temp, store) = store_with("a=1\nb=2");
        store.activate();
        store.set_one("a", Some("   ")).unwrap();
        store.set_one("b", None).unwrap();
        assert!(store.snapshot().unwrap().is_empty());
    }
}
