//! Service lookup over a dynamic registry
//!
//! [`CapabilityLookup`] resolves services by type from any [`Registry`],
//! either immediately or by polling until a deadline, and keeps track of
//! every reference it resolved so they can be released together.
//! [`InMemoryRegistry`] is a registry for use inside one process.

pub mod config;
pub mod error;
pub mod filter;
pub mod interrupt;
pub mod lookup;
pub mod memory;
pub mod registry;

pub use config::LookupConfig;
pub use error::{Error, RegistryError, Result};
pub use filter::Filter;
pub use interrupt::InterruptHandle;
pub use lookup::CapabilityLookup;
pub use memory::{InMemoryRegistry, OBJECT_CLASS, SERVICE_ID, SERVICE_RANKING};
pub use registry::{Registry, ServiceInstance, ServiceReference, ServiceType};
