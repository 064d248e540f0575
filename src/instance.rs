//! Per-definition materialization and caching
//!
//! An [`ObjectInstance`] pairs one [`Definition`] with the value cache its
//! scope calls for.
//!
//! Singletons use double-checked locking: a cached value is returned
//! straight from a read lock, and only a miss takes the construction mutex.
//! Construction re-entering the same instance on one thread is reported as
//! a circular dependency instead of deadlocking on that mutex.

use crate::definition::{AnyArc, Definition, Source};
use crate::{Container, DiError, Result, Scope};
use parking_lot::{Mutex, RwLock};
use std::cell::RefCell;
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::{debug, trace};

thread_local! {
    /// Instances currently under construction on this thread, by address
    static CONSTRUCTING: RefCell<Vec<usize>> = const { RefCell::new(Vec::new()) };
}

/// Marks an instance as under construction until dropped.
struct ConstructionGuard {
    address: usize,
}

impl ConstructionGuard {
    fn enter(instance: &ObjectInstance) -> Result<Self> {
        let address = instance as *const ObjectInstance as usize;
        CONSTRUCTING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if stack.contains(&address) {
                let definition = &instance.definition;
                return Err(DiError::circular(
                    definition.implementation().name(),
                    definition.qualifiers(),
                ));
            }
            stack.push(address);
            Ok(Self { address })
        })
    }
}

impl Drop for ConstructionGuard {
    fn drop(&mut self) {
        CONSTRUCTING.with(|stack| {
            let mut stack = stack.borrow_mut();
            if let Some(pos) = stack.iter().rposition(|a| *a == self.address) {
                stack.remove(pos);
            }
        });
    }
}

/// A definition plus its cached value.
pub(crate) struct ObjectInstance {
    definition: Arc<Definition>,
    cached: RwLock<Option<AnyArc>>,
    mutex: Mutex<()>,
}

impl ObjectInstance {
    pub(crate) fn new(definition: Definition) -> Self {
        Self {
            definition: Arc::new(definition),
            cached: RwLock::new(None),
            mutex: Mutex::new(()),
        }
    }

    /// The definition this instance materializes
    #[inline]
    pub(crate) fn definition(&self) -> &Definition {
        &self.definition
    }

    pub(crate) fn shared_definition(&self) -> Arc<Definition> {
        Arc::clone(&self.definition)
    }

    /// Resolve the value according to the scope.
    pub(crate) fn get_instance(&self, container: &Container) -> Result<AnyArc> {
        match self.definition.scope() {
            Scope::Prototype => {
                let _guard = ConstructionGuard::enter(self)?;
                self.materialize(container)
            }
            Scope::Singleton => {
                if let Some(value) = self.cached.read().as_ref() {
                    #[cfg(feature = "logging")]
                    trace!(
                        target: "object_factory",
                        service = self.definition.implementation().name(),
                        "Singleton already materialized, returning cached value"
                    );
                    return Ok(Arc::clone(value));
                }

                let _guard = ConstructionGuard::enter(self)?;
                let _lock = self.mutex.lock();

                // Another thread may have finished while we waited
                if let Some(value) = self.cached.read().as_ref() {
                    return Ok(Arc::clone(value));
                }

                let value = self.materialize(container)?;
                *self.cached.write() = Some(Arc::clone(&value));
                Ok(value)
            }
        }
    }

    fn materialize(&self, container: &Container) -> Result<AnyArc> {
        #[cfg(feature = "logging")]
        debug!(
            target: "object_factory",
            service = self.definition.implementation().name(),
            scope = %self.definition.scope(),
            "Materializing object"
        );

        match self.definition.source() {
            Source::Producer(producer) => producer.produce(container),
            Source::ReflectiveType(reflective) => reflective.build(container),
        }
    }

    /// The cached singleton value, if materialized
    pub(crate) fn cached(&self) -> Option<AnyArc> {
        self.cached.read().clone()
    }

    /// Take the cached value out, leaving the instance unmaterialized
    pub(crate) fn clear_instance(&self) -> Option<AnyArc> {
        self.cached.write().take()
    }
}

impl std::fmt::Debug for ObjectInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectInstance")
            .field("definition", &self.definition)
            .field("materialized", &self.cached().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Registration;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Barrier;
    use std::thread;

    struct Counter(usize);

    fn counting(scope: Scope, calls: Arc<AtomicUsize>) -> ObjectInstance {
        let registration = Registration::producer(move |_| {
            Ok(Counter(calls.fetch_add(1, Ordering::SeqCst)))
        })
        .scope(scope);
        ObjectInstance::new(registration.into_definition())
    }

    #[test]
    fn test_singleton_is_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let instance = counting(Scope::Singleton, Arc::clone(&calls));
        let container = Container::new();

        let a = instance.get_instance(&container).unwrap();
        let b = instance.get_instance(&container).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(instance.cached().is_some());
    }

    #[test]
    fn test_prototype_is_never_cached() {
        let calls = Arc::new(AtomicUsize::new(0));
        let instance = counting(Scope::Prototype, Arc::clone(&calls));
        let container = Container::new();

        let a = instance.get_instance(&container).unwrap();
        let b = instance.get_instance(&container).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(instance.cached().is_none());
    }

    #[test]
    fn test_clear_instance_forces_rebuild() {
        let calls = Arc::new(AtomicUsize::new(0));
        let instance = counting(Scope::Singleton, Arc::clone(&calls));
        let container = Container::new();

        instance.get_instance(&container).unwrap();
        assert!(instance.clear_instance().is_some());
        assert!(instance.clear_instance().is_none());

        instance.get_instance(&container).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_concurrent_singleton_materializes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let instance = Arc::new(counting(Scope::Singleton, Arc::clone(&calls)));
        let container = Container::new();
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let instance = Arc::clone(&instance);
                let container = container.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    instance.get_instance(&container).unwrap()
                })
            })
            .collect();

        let values: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|v| Arc::ptr_eq(v, &values[0])));
    }

    #[test]
    fn test_reentry_is_circular() {
        let instance = counting(Scope::Singleton, Arc::new(AtomicUsize::new(0)));
        let _outer = ConstructionGuard::enter(&instance).unwrap();

        let err = ConstructionGuard::enter(&instance).err().unwrap();
        assert!(err.is_circular());
    }
}
