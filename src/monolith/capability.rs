//! Capability registry
//!
//! Modules export trait objects (for example `Arc<dyn WorkoutClient>`) during
//! setup, and siblings resolve them during post-setup. Entries are keyed by
//! the `TypeId` of the trait object type itself, so no concrete type ever
//! crosses a module boundary.

use super::{MonolithError, Result};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::any::{Any, TypeId, type_name};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

struct CapabilityEntry {
    // Holds an `Arc<T>` boxed as `Any`; `T` itself may be unsized.
    instance: Arc<dyn Any + Send + Sync>,
    provider: String,
}

/// Thread-safe registry of the capabilities exported by modules.
pub struct Capabilities {
    entries: DashMap<TypeId, CapabilityEntry>,
    ready: AtomicBool,
}

impl Capabilities {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            ready: AtomicBool::new(false),
        }
    }

    /// Export `capability` under the type `T`.
    ///
    /// Only allowed while modules are being set up.
    pub fn provide<T>(&self, provider: &str, capability: Arc<T>) -> Result<()>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        if self.is_ready() {
            return Err(MonolithError::CapabilityLate {
                capability: type_name::<T>(),
            });
        }

        match self.entries.entry(TypeId::of::<T>()) {
            Entry::Occupied(existing) => Err(MonolithError::CapabilityDuplicate {
                capability: type_name::<T>(),
                provider: existing.get().provider.clone(),
            }),
            Entry::Vacant(slot) => {
                slot.insert(CapabilityEntry {
                    instance: Arc::new(capability),
                    provider: provider.to_string(),
                });
                Ok(())
            }
        }
    }

    /// Look up the capability exported under `T`.
    ///
    /// Fails with [`MonolithError::CapabilityNotReady`] until every module
    /// has completed setup.
    pub fn resolve<T>(&self) -> Result<Arc<T>>
    where
        T: ?Sized + Send + Sync + 'static,
    {
        if !self.is_ready() {
            return Err(MonolithError::CapabilityNotReady {
                capability: type_name::<T>(),
            });
        }

        let missing = || MonolithError::CapabilityMissing {
            capability: type_name::<T>(),
        };
        let entry = self.entries.get(&TypeId::of::<T>()).ok_or_else(missing)?;
        let wrapper = entry
            .instance
            .clone()
            .downcast::<Arc<T>>()
            .map_err(|_| missing())?;
        Ok(wrapper.as_ref().clone())
    }

    /// Name of the module that exported `T`, if any
    pub fn provider_of<T>(&self) -> Option<String>
    where
        T: ?Sized + 'static,
    {
        self.entries
            .get(&TypeId::of::<T>())
            .map(|entry| entry.provider.clone())
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub(crate) fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new()
    }
}

/// A sibling capability that is bound after the owning module's routes are
/// already live.
///
/// Routes are registered during setup but sibling capabilities can only be
/// resolved in post-setup, so handlers hold a `Deferred` and answer
/// [`MonolithError::Unbound`] until it is bound.
pub struct Deferred<T: ?Sized + Send + Sync + 'static> {
    slot: Arc<OnceLock<Arc<T>>>,
}

impl<T: ?Sized + Send + Sync + 'static> Deferred<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(OnceLock::new()),
        }
    }

    /// Bind the capability. A slot can be bound exactly once.
    pub fn bind(&self, capability: Arc<T>) -> Result<()> {
        self.slot
            .set(capability)
            .map_err(|_| MonolithError::AlreadyBound {
                capability: type_name::<T>(),
            })
    }

    /// Resolve `T` from the registry and bind it
    pub fn bind_from(&self, capabilities: &Capabilities) -> Result<()> {
        self.bind(capabilities.resolve::<T>()?)
    }

    pub fn get(&self) -> Result<Arc<T>> {
        self.slot.get().cloned().ok_or(MonolithError::Unbound {
            capability: type_name::<T>(),
        })
    }

    pub fn is_bound(&self) -> bool {
        self.slot.get().is_some()
    }
}

impl<T: ?Sized + Send + Sync + 'static> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: ?Sized + Send + Sync + 'static> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Counter: Send + Sync {
        fn value(&self) -> i32;
    }

    struct FixedCounter {
        value: i32,
    }

    impl Counter for FixedCounter {
        fn value(&self) -> i32 {
            self.value
        }
    }

    #[test]
    fn test_provide_and_resolve_trait_object() {
        let caps = Capabilities::new();
        caps.provide::<dyn Counter>("counter", Arc::new(FixedCounter { value: 99 }))
            .unwrap();
        caps.mark_ready();

        let counter = caps.resolve::<dyn Counter>().unwrap();
        assert_eq!(counter.value(), 99);
        assert_eq!(caps.provider_of::<dyn Counter>().as_deref(), Some("counter"));
    }

    #[test]
    fn test_resolve_before_ready_is_rejected() {
        let caps = Capabilities::new();
        caps.provide::<dyn Counter>("counter", Arc::new(FixedCounter { value: 1 }))
            .unwrap();

        let err = caps.resolve::<dyn Counter>().err().unwrap();
        assert!(matches!(err, MonolithError::CapabilityNotReady { .. }));
    }

    #[test]
    fn test_missing_duplicate_and_late() {
        let caps = Capabilities::new();
        caps.provide::<dyn Counter>("a", Arc::new(FixedCounter { value: 1 }))
            .unwrap();
        let dup = caps
            .provide::<dyn Counter>("b", Arc::new(FixedCounter { value: 2 }))
            .unwrap_err();
        assert!(matches!(dup, MonolithError::CapabilityDuplicate { ref provider, .. } if provider == "a"));

        caps.mark_ready();
        assert!(matches!(
            caps.resolve::<String>().err().unwrap(),
            MonolithError::CapabilityMissing { .. }
        ));
        assert!(matches!(
            caps.provide::<String>("c", Arc::new("late".to_string()))
                .unwrap_err(),
            MonolithError::CapabilityLate { .. }
        ));
    }

    #[test]
    fn test_deferred_binds_once_and_is_shared_by_clones() {
        let deferred: Deferred<dyn Counter> = Deferred::new();
        let handle = deferred.clone();
        assert!(matches!(
            handle.get().err().unwrap(),
            MonolithError::Unbound { .. }
        ));

        deferred.bind(Arc::new(FixedCounter { value: 5 })).unwrap();
        assert_eq!(handle.get().unwrap().value(), 5);
        assert!(matches!(
            deferred
                .bind(Arc::new(FixedCounter { value: 6 }))
                .unwrap_err(),
            MonolithError::AlreadyBound { .. }
        ));
    }
}
