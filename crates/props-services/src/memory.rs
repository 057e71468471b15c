//! In-process service registry

use crate::error::RegistryError;
use crate::filter::Filter;
use crate::registry::{Registry, ServiceInstance, ServiceReference, ServiceType};
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

/// Property holding the registered type name, usable in filters.
pub const OBJECT_CLASS: &str = "objectClass";
/// Property holding the registry-assigned id.
pub const SERVICE_ID: &str = "service.id";
/// Integer property; higher ranked registrations are preferred.
pub const SERVICE_RANKING: &str = "service.ranking";

struct Registration {
    reference: ServiceReference,
    instance: ServiceInstance,
    properties: BTreeMap<String, String>,
    ranking: i32,
    use_count: usize,
}

#[derive(Default)]
struct Inner {
    next_id: u64,
    registrations: HashMap<u64, Registration>,
}

impl Inner {
    /// Matching registrations, highest ranking first, then oldest first.
    fn ranked<'a>(
        &'a self,
        service: ServiceType,
        filter: &'a Filter,
    ) -> impl Iterator<Item = &'a Registration> + 'a {
        let mut matching: Vec<_> = self
            .registrations
            .values()
            .filter(|r| r.reference.service() == service && filter.matches(&r.properties))
            .collect();
        matching.sort_by_key(|r| (std::cmp::Reverse(r.ranking), r.reference.id()));
        matching.into_iter()
    }
}

/// A thread-safe registry living in the current process.
///
/// Tracks a use count per registration: each successful `resolve` adds
/// one, each `release` takes one away.
#[derive(Default)]
pub struct InMemoryRegistry {
    inner: Mutex<Inner>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register `instance` under its own type.
    pub fn register<T: Any + Send + Sync>(
        &self,
        instance: Arc<T>,
        properties: BTreeMap<String, String>,
    ) -> ServiceReference {
        let service = ServiceType::of::<T>();
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;

        let mut properties = properties;
        properties.insert(OBJECT_CLASS.to_string(), service.name().to_string());
        properties.insert(SERVICE_ID.to_string(), id.to_string());
        let ranking = properties
            .get(SERVICE_RANKING)
            .and_then(|r| r.trim().parse().ok())
            .unwrap_or(0);

        let reference = ServiceReference::new(id, service);
        inner.registrations.insert(
            id,
            Registration {
                reference: reference.clone(),
                instance,
                properties,
                ranking,
                use_count: 0,
            },
        );
        tracing::debug!(id, service = %service, ranking, "Registered service");
        reference
    }

    /// Remove a registration. Returns false if it was not registered.
    pub fn unregister(&self, reference: &ServiceReference) -> bool {
        let removed = self.lock().registrations.remove(&reference.id());
        if let Some(registration) = &removed {
            tracing::debug!(
                id = reference.id(),
                use_count = registration.use_count,
                "Unregistered service"
            );
        }
        removed.is_some()
    }

    /// Outstanding resolves of `reference`; 0 when unregistered.
    pub fn use_count(&self, reference: &ServiceReference) -> usize {
        self.lock()
            .registrations
            .get(&reference.id())
            .map_or(0, |r| r.use_count)
    }

    /// Properties of a registration, including `objectClass` and `service.id`.
    pub fn properties(&self, reference: &ServiceReference) -> Option<BTreeMap<String, String>> {
        self.lock()
            .registrations
            .get(&reference.id())
            .map(|r| r.properties.clone())
    }

    pub fn len(&self) -> usize {
        self.lock().registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Registry for InMemoryRegistry {
    fn find_reference(&self, service: ServiceType) -> Result<Option<ServiceReference>, RegistryError> {
        let inner = self.lock();
        Ok(inner
            .ranked(service, &Filter::Any)
            .next()
            .map(|r| r.reference.clone()))
    }

    fn find_references(
        &self,
        service: ServiceType,
        filter: &str,
    ) -> Result<Vec<ServiceReference>, RegistryError> {
        let filter = Filter::parse(filter)?;
        let inner = self.lock();
        Ok(inner
            .ranked(service, &filter)
            .map(|r| r.reference.clone())
            .collect())
    }

    fn resolve(&self, reference: &ServiceReference) -> Result<Option<ServiceInstance>, RegistryError> {
        let mut inner = self.lock();
        Ok(inner.registrations.get_mut(&reference.id()).map(|r| {
            r.use_count += 1;
            Arc::clone(&r.instance)
        }))
    }

    fn release(&self, reference: &ServiceReference) -> Result<(), RegistryError> {
        let mut inner = self.lock();
        let id = reference.id();
        let registration = inner
            .registrations
            .get_mut(&id)
            .ok_or(RegistryError::UnknownReference { id })?;
        if registration.use_count == 0 {
            return Err(RegistryError::NotInUse { id });
        }
        registration.use_count -= 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greeter(&'static str);
    struct Other;

    fn ranked(rank: i32) -> BTreeMap<String, String> {
        BTreeMap::from([(SERVICE_RANKING.to_string(), rank.to_string())])
    }

    #[test]
    fn empty_registry_finds_nothing() {
        let registry = InMemoryRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.find_reference(ServiceType::of::<Greeter>()).unwrap(), None);
    }

    #[test]
    fn finds_by_type_only() {
        let registry = InMemoryRegistry::new();
        registry.register(Arc::new(Other), BTreeMap::new());
        assert_eq!(registry.find_reference(ServiceType::of::<Greeter>()).unwrap(), None);

        let greeter = registry.register(Arc::new(Greeter("hi")), BTreeMap::new());
        assert_eq!(registry.find_reference(ServiceType::of::<Greeter>()).unwrap(), Some(greeter));
    }

    #[test]
    fn prefers_highest_ranking_then_oldest() {
        let registry = InMemoryRegistry::new();
        let low = registry.register(Arc::new(Greeter("low")), ranked(-1));
        let first_default = registry.register(Arc::new(Greeter("a")), BTreeMap::new());
        let _second_default = registry.register(Arc::new(Greeter("b")), BTreeMap::new());
        let service = ServiceType::of::<Greeter>();

        assert_eq!(registry.find_reference(service).unwrap(), Some(first_default.clone()));

        let high = registry.register(Arc::new(Greeter("high")), ranked(10));
        assert_eq!(registry.find_reference(service).unwrap(), Some(high.clone()));

        let all = registry.find_references(service, "").unwrap();
        assert_eq!(all.first(), Some(&high));
        assert_eq!(all.last(), Some(&low));
    }

    #[test]
    fn filters_by_properties() {
        let registry = InMemoryRegistry::new();
        registry.register(
            Arc::new(Greeter("en")),
            BTreeMap::from([("lang".to_string(), "en".to_string())]),
        );
        let fr = registry.register(
            Arc::new(Greeter("fr")),
            BTreeMap::from([("lang".to_string(), "fr".to_string())]),
        );

        let found = registry
            .find_references(ServiceType::of::<Greeter>(), "(lang=fr)")
            .unwrap();
        assert_eq!(found, vec![fr]);
    }

    #[test]
    fn invalid_filter_is_an_error() {
        let registry = InMemoryRegistry::new();
        let err = registry
            .find_references(ServiceType::of::<Greeter>(), "(lang=fr")
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidFilter { .. }));
    }

    #[test]
    fn resolve_and_release_track_use_count() {
        let registry = InMemoryRegistry::new();
        let reference = registry.register(Arc::new(Greeter("hi")), BTreeMap::new());

        let instance = registry.resolve(&reference).unwrap().unwrap();
        assert_eq!(instance.downcast::<Greeter>().unwrap().0, "hi");
        registry.resolve(&reference).unwrap();
        assert_eq!(registry.use_count(&reference), 2);

        registry.release(&reference).unwrap();
        registry.release(&reference).unwrap();
        assert_eq!(registry.use_count(&reference), 0);
        assert_eq!(
            registry.release(&reference),
            Err(RegistryError::NotInUse { id: reference.id() })
        );
    }

    #[test]
    fn unregistered_reference_resolves_to_none() {
        let registry = InMemoryRegistry::new();
        let reference = registry.register(Arc::new(Greeter("hi")), BTreeMap::new());
        assert!(registry.unregister(&reference));
        assert!(!registry.unregister(&reference));

        assert!(registry.resolve(&reference).unwrap().is_none());
        assert_eq!(
            registry.release(&reference),
            Err(RegistryError::UnknownReference { id: reference.id() })
        );
    }

    #[test]
    fn registration_properties_include_identity() {
        let registry = InMemoryRegistry::new();
        let reference = registry.register(Arc::new(Greeter("hi")), BTreeMap::new());
        let props = registry.properties(&reference).unwrap();
        assert_eq!(props[SERVICE_ID], reference.id().to_string());
        assert!(props[OBJECT_CLASS].ends_with("Greeter"));
    }
}
