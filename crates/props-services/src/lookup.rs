//! Service lookup with reference tracking

use crate::config::LookupConfig;
use crate::error::{Error, RegistryError, Result};
use crate::interrupt::InterruptHandle;
use crate::registry::{Registry, ServiceReference, ServiceType};
use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

type Held = HashMap<ServiceReference, usize>;

/// Resolves services from a [`Registry`] and remembers every reference it
/// resolved, so they can all be given back with [`CapabilityLookup::close`].
///
/// Meant for a single owner. Lookups may run from several threads, but a
/// lookup racing `close` from another thread may fail with
/// [`Error::Disposed`] or have its reference released behind it.
///
/// Dropping the lookup closes it.
pub struct CapabilityLookup {
    registry: Arc<dyn Registry>,
    config: LookupConfig,
    held: Mutex<Option<Held>>,
    interrupt: InterruptHandle,
}

impl CapabilityLookup {
    pub fn new(registry: Arc<dyn Registry>) -> Self {
        Self::with_config(registry, LookupConfig::default())
    }

    pub fn with_config(registry: Arc<dyn Registry>, config: LookupConfig) -> Self {
        Self {
            registry,
            config,
            held: Mutex::new(Some(Held::new())),
            interrupt: InterruptHandle::new(),
        }
    }

    /// Handle for interrupting waits of this lookup from another thread.
    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    fn held(&self) -> MutexGuard<'_, Option<Held>> {
        self.held.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_closed(&self) -> bool {
        self.held().is_none()
    }

    /// Number of distinct references currently held.
    pub fn held_references(&self) -> usize {
        self.held().as_ref().map_or(0, HashMap::len)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::Disposed);
        }
        Ok(())
    }

    /// Resolve one service registered under `T`, without waiting.
    ///
    /// # Errors
    ///
    /// [`Error::NotFound`] if nothing live is registered, [`Error::Registry`]
    /// if the registry fails, [`Error::Disposed`] after `close`.
    pub fn get_one<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        self.ensure_open()?;
        let service = ServiceType::of::<T>();
        let reference = self
            .registry
            .find_reference(service)
            .map_err(|source| registry_error(service, None, source))?;

        if let Some(reference) = reference {
            if let Some(instance) = self.acquire::<T>(&reference, None)? {
                return Ok(instance);
            }
        }
        Err(Error::NotFound {
            service,
            filter: None,
        })
    }

    /// Poll for a service registered under `T` until `timeout` has passed.
    pub fn wait_for<T: Any + Send + Sync>(&self, timeout: Duration) -> Result<Arc<T>> {
        self.poll(None, timeout)
    }

    /// Poll for a service under `T` matching `filter` until `timeout` has
    /// passed. The filter goes to the registry verbatim.
    pub fn wait_for_filtered<T: Any + Send + Sync>(
        &self,
        filter: &str,
        timeout: Duration,
    ) -> Result<Arc<T>> {
        self.poll(Some(filter), timeout)
    }

    fn poll<T: Any + Send + Sync>(&self, filter: Option<&str>, timeout: Duration) -> Result<Arc<T>> {
        self.ensure_open()?;
        let service = ServiceType::of::<T>();
        let started = Instant::now();

        loop {
            let candidate = match filter {
                None => self.registry.find_reference(service),
                Some(f) => self
                    .registry
                    .find_references(service, f)
                    .map(|refs| refs.into_iter().next()),
            }
            .map_err(|source| registry_error(service, filter, source))?;

            if let Some(reference) = candidate {
                if let Some(instance) = self.acquire::<T>(&reference, filter)? {
                    return Ok(instance);
                }
            }

            if self.interrupt.sleep(self.config.poll_interval()) {
                return Err(Error::Interrupted { service });
            }

            // Deadline is checked after the sleep, so the wait may overrun by one interval
            let waited = started.elapsed();
            if waited > timeout {
                tracing::debug!(service = %service, ?filter, ?waited, "Timed out waiting for service");
                return Err(Error::Timeout {
                    service,
                    filter: filter.map(str::to_string),
                    waited,
                });
            }
        }
    }

    /// Resolve `reference` and record it as held.
    ///
    /// `Ok(None)` means no live instance of type `T` was behind it.
    fn acquire<T: Any + Send + Sync>(
        &self,
        reference: &ServiceReference,
        filter: Option<&str>,
    ) -> Result<Option<Arc<T>>> {
        let service = reference.service();
        let Some(instance) = self
            .registry
            .resolve(reference)
            .map_err(|source| registry_error(service, filter, source))?
        else {
            return Ok(None);
        };

        let instance = match instance.downcast::<T>() {
            Ok(instance) => instance,
            Err(_) => {
                tracing::warn!(id = reference.id(), service = %service, "Registry returned an instance of the wrong type");
                self.give_back(reference);
                return Ok(None);
            }
        };

        let mut held = self.held();
        match held.as_mut() {
            Some(map) => {
                *map.entry(reference.clone()).or_insert(0) += 1;
                tracing::debug!(id = reference.id(), service = %service, "Acquired service reference");
                Ok(Some(instance))
            }
            None => {
                drop(held);
                self.give_back(reference);
                Err(Error::Disposed)
            }
        }
    }

    fn give_back(&self, reference: &ServiceReference) -> bool {
        match self.registry.release(reference) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(id = reference.id(), service = %reference.service(), error = %e, "Failed releasing service reference");
                false
            }
        }
    }

    /// Release every held reference and mark the lookup dead.
    ///
    /// Each reference is released once per time it was resolved. A failed
    /// release is logged and does not stop the others. Returns the number
    /// of successful releases; closing twice is a no-op.
    pub fn close(&self) -> usize {
        let Some(held) = self.held().take() else {
            return 0;
        };

        let mut released = 0;
        let mut failed = 0;
        for (reference, count) in &held {
            for _ in 0..*count {
                if self.give_back(reference) {
                    released += 1;
                } else {
                    failed += 1;
                }
            }
        }

        tracing::info!(released, failed, "Closed service lookup");
        released
    }
}

fn registry_error(service: ServiceType, filter: Option<&str>, source: RegistryError) -> Error {
    Error::Registry {
        service,
        filter: filter.map(str::to_string),
        source,
    }
}

impl Drop for CapabilityLookup {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for CapabilityLookup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityLookup")
            .field("config", &self.config)
            .field("held_references", &self.held_references())
            .field("closed", &self.is_closed())
            .finish()
    }
}
