//! The registry boundary a lookup queries

use crate::error::RegistryError;
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A resolved service instance, type-erased.
pub type ServiceInstance = Arc<dyn Any + Send + Sync>;

/// The type a service is registered and looked up under.
#[derive(Debug, Clone, Copy)]
pub struct ServiceType {
    id: TypeId,
    name: &'static str,
}

impl ServiceType {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for ServiceType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Handle to one registration, distinct from the instance it resolves to.
///
/// Identity is the registry-assigned id.
#[derive(Debug, Clone)]
pub struct ServiceReference {
    id: u64,
    service: ServiceType,
}

impl ServiceReference {
    pub fn new(id: u64, service: ServiceType) -> Self {
        Self { id, service }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn service(&self) -> ServiceType {
        self.service
    }
}

impl PartialEq for ServiceReference {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ServiceReference {}

impl Hash for ServiceReference {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// A registry of dynamically registered services.
///
/// Filter expressions are passed through untouched; their syntax is the
/// implementation's business.
pub trait Registry: Send + Sync {
    /// Any one reference registered under `service`.
    fn find_reference(&self, service: ServiceType) -> Result<Option<ServiceReference>, RegistryError>;

    /// All references under `service` that match `filter`, best first.
    fn find_references(
        &self,
        service: ServiceType,
        filter: &str,
    ) -> Result<Vec<ServiceReference>, RegistryError>;

    /// The live instance behind `reference`, or `None` if it is gone.
    ///
    /// A successful resolve must be paired with one [`Registry::release`].
    fn resolve(&self, reference: &ServiceReference) -> Result<Option<ServiceInstance>, RegistryError>;

    /// Give back one resolve of `reference`.
    fn release(&self, reference: &ServiceReference) -> Result<(), RegistryError>;
}
