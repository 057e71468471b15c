//! End-to-end integration test for the property store and service lookup
//!
//! Exercises the complete flow: framework properties -> store activation ->
//! registry publication -> lookup -> typed reads and writes -> close.

use pretty_assertions::assert_eq;
use props_core::{
    ConfigurationProperties, ConfigurationPropertiesExt, FrameworkProperties, LoadOutcome,
    PropertyStore, StoreConfig, Uri,
};
use props_services::{CapabilityLookup, InMemoryRegistry, LookupConfig, SERVICE_RANKING};
use props_test_utils::PropsFile;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const FILE_PROPERTY: &str = "app.config.file";

/// Set up a properties file and a store pointed at it
fn setup_store(contents: &str) -> (PropsFile, Arc<PropertyStore>) {
    let file = PropsFile::with_contents(contents);
    let framework = FrameworkProperties::new().with(FILE_PROPERTY, file.path_str());
    let store = PropertyStore::new(StoreConfig::new(FILE_PROPERTY), framework);
    (file, Arc::new(store))
}

#[test]
fn test_store_published_and_looked_up() {
    let (file, store) = setup_store(
        "# service settings\n\
         server.port=8080\n\
         server.endpoint=https://example.com:8443/api\n\
         feature.enabled=TRUE\n",
    );
    assert!(matches!(store.activate(), LoadOutcome::Loaded(3)));

    let registry = Arc::new(InMemoryRegistry::new());
    let reference = registry.register(store.clone(), BTreeMap::new());
    let lookup = CapabilityLookup::new(registry.clone());

    let found = lookup.get_one::<PropertyStore>().unwrap();
    assert!(Arc::ptr_eq(&found, &store));
    assert_eq!(registry.use_count(&reference), 1);

    // Typed reads through the service API
    assert_eq!(found.get::<u16>("server.port").unwrap(), Some(8080));
    let endpoint: Uri = found.get("server.endpoint").unwrap().unwrap();
    assert_eq!(endpoint.host(), Some("example.com"));
    assert_eq!(endpoint.port(), Some(8443));
    assert!(found.get_or("feature.enabled", false));
    assert!(!found.get_or("server.port", true));
    assert_eq!(found.get_or::<i32>("missing.value", 7), 7);

    // Writes land in the backing file
    found.set_one("server.port", Some("9090")).unwrap();
    assert!(file.contains_line("server.port=9090"));

    assert_eq!(lookup.close(), 1);
    assert_eq!(registry.use_count(&reference), 0);
}

#[test]
fn test_waiting_consumer_sees_late_store() {
    let (_file, store) = setup_store("greeting=hello\n");
    let registry = Arc::new(InMemoryRegistry::new());
    let lookup = CapabilityLookup::with_config(
        registry.clone(),
        LookupConfig::with_poll_interval(Duration::from_millis(5)),
    );

    let publisher = {
        let registry = registry.clone();
        let store = store.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(40));
            store.activate();
            registry.register(store, BTreeMap::new())
        })
    };

    let found = lookup
        .wait_for::<PropertyStore>(Duration::from_secs(5))
        .unwrap();
    publisher.join().unwrap();
    assert_eq!(
        found.get::<String>("greeting").unwrap().as_deref(),
        Some("hello")
    );
}

#[test]
fn test_filtered_lookup_picks_store_by_scope() {
    let (_defaults_file, defaults) = setup_store("timeout=30\n");
    let (_tenant_file, tenant) = setup_store("timeout=5\n");
    defaults.activate();
    tenant.activate();

    let registry = Arc::new(InMemoryRegistry::new());
    registry.register(
        defaults,
        BTreeMap::from([("scope".to_string(), "defaults".to_string())]),
    );
    registry.register(
        tenant,
        BTreeMap::from([
            ("scope".to_string(), "tenant".to_string()),
            (SERVICE_RANKING.to_string(), "10".to_string()),
        ]),
    );
    let lookup = CapabilityLookup::new(registry);

    // Ranking wins for unfiltered lookups
    let best = lookup.get_one::<PropertyStore>().unwrap();
    assert_eq!(best.get_or("timeout", 0u32), 5);

    let scoped = lookup
        .wait_for_filtered::<PropertyStore>("(scope=defaults)", Duration::from_millis(50))
        .unwrap();
    assert_eq!(scoped.get_or("timeout", 0u32), 30);
    assert_eq!(lookup.held_references(), 2);
}

#[test]
fn test_external_edit_visible_after_reload() {
    let (file, store) = setup_store("mode=fast\n");
    store.activate();

    file.write("mode=safe\nretries=3\n");
    assert_eq!(store.get::<String>("mode").unwrap().as_deref(), Some("fast"));

    assert!(matches!(store.reload().unwrap(), LoadOutcome::Loaded(2)));
    assert_eq!(store.get::<String>("mode").unwrap().as_deref(), Some("safe"));
    assert_eq!(store.get::<u8>("retries").unwrap(), Some(3));
}

#[test]
fn test_missing_backing_file_degrades_gracefully() {
    let (file, store) = setup_store("a=1\n");
    file.remove();

    assert!(matches!(store.activate(), LoadOutcome::Degraded(_)));
    let props: &dyn ConfigurationProperties = store.as_ref();
    assert_eq!(props.get::<i32>("a").unwrap(), None);
    assert_eq!(props.get_or::<i32>("a", -1), -1);
    assert!(store.set_one("a", Some("2")).is_err());
}

#[test]
fn test_lookup_drop_leaves_store_usable() {
    let (_file, store) = setup_store("k=v\n");
    store.activate();

    let registry = Arc::new(InMemoryRegistry::new());
    registry.register(store.clone(), BTreeMap::new());
    {
        let lookup = CapabilityLookup::new(registry.clone());
        lookup.get_one::<PropertyStore>().unwrap();
    }

    // Closing the lookup releases the reference but leaves the store alone
    assert_eq!(store.raw("k").unwrap().as_deref(), Some("v"));
    store.dispose();
    assert!(store.raw("k").is_err());
}
