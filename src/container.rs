//! The object factory container
//!
//! The `Container` owns the registered definitions, validates them once,
//! resolves objects by type and qualifiers, and tears cached singletons
//! down again.

use crate::definition::{Definition, Registration, Source, TypeKey};
use crate::injection::{Component, InjectionTarget};
use crate::instance::ObjectInstance;
use crate::qualifier::QualifierMatcher;
use crate::scanner;
use crate::storage::ObjectRegistry;
use crate::{DiError, Injectable, Qualifiers, Result, Selection};
use once_cell::sync::OnceCell;
use std::any::{Any, TypeId};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

#[cfg(feature = "logging")]
use tracing::{debug, info, trace, warn};

/// Lifecycle state of a [`Container`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContainerState {
    /// Accepting registrations
    Unconfigured = 0,
    /// Checking every component's dependencies
    Validating = 1,
    /// Resolving objects; the definition set is frozen
    Ready = 2,
    /// Validation failed; every later resolution fails the same way
    Failed = 3,
    /// Torn down
    Destroyed = 4,
}

impl ContainerState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Unconfigured,
            1 => Self::Validating,
            2 => Self::Ready,
            3 => Self::Failed,
            _ => Self::Destroyed,
        }
    }
}

impl std::fmt::Display for ContainerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unconfigured => "unconfigured",
            Self::Validating => "validating",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Destroyed => "destroyed",
        };
        f.write_str(name)
    }
}

/// Dependency injection container.
///
/// Cloning is cheap and every clone shares the same definitions and
/// cached objects.
///
/// # Examples
///
/// ```rust
/// use object_factory::{Container, Registration};
///
/// struct Database { url: String }
///
/// let container = Container::new();
/// container
///     .register(Registration::producer(|_| Ok(Database { url: "postgres://localhost".into() })))
///     .unwrap();
///
/// let db = container.get_object::<Database>().unwrap();
/// assert_eq!(db.url, "postgres://localhost");
/// ```
#[derive(Clone)]
pub struct Container {
    /// Registered definitions and their cached values
    registry: Arc<ObjectRegistry>,
    /// Current `ContainerState`
    state: Arc<AtomicU8>,
    /// Outcome of the one-time validation
    initialized: Arc<OnceCell<Result<()>>>,
}

impl Container {
    /// Create an empty, unconfigured container.
    #[inline]
    pub fn new() -> Self {
        #[cfg(feature = "logging")]
        debug!(target: "object_factory", "Creating new object factory container");

        Self {
            registry: Arc::new(ObjectRegistry::new()),
            state: Arc::new(AtomicU8::new(ContainerState::Unconfigured as u8)),
            initialized: Arc::new(OnceCell::new()),
        }
    }

    // =========================================================================
    // Configuration
    // =========================================================================

    /// Add a provider.
    ///
    /// Only legal before the first resolution (or an explicit
    /// [`initialize`](Self::initialize)).
    pub fn register<T: Injectable>(&self, registration: Registration<T>) -> Result<()> {
        self.check_configurable("register")?;
        let definition = registration.into_definition();

        #[cfg(feature = "logging")]
        debug!(
            target: "object_factory",
            service = definition.implementation().name(),
            scope = %definition.scope(),
            qualifiers = %definition.qualifiers(),
            types = definition.types().count(),
            service_count = self.registry.len() + 1,
            "Registering object definition"
        );

        self.registry.insert(definition);
        Ok(())
    }

    /// Remove every provider of `T` registered with exactly `qualifiers`.
    ///
    /// Returns how many definitions were removed.
    pub fn unregister<T: ?Sized + 'static>(&self, qualifiers: &Qualifiers) -> Result<usize> {
        self.check_configurable("unregister")?;
        let key = TypeKey::of::<T>();
        let removed = self.registry.remove_where(|d| {
            d.has_type(&key) && QualifierMatcher::matches_exact(d.qualifiers(), qualifiers)
        });

        #[cfg(feature = "logging")]
        debug!(
            target: "object_factory",
            service = key.name(),
            qualifiers = %qualifiers,
            removed,
            "Unregistered object definitions"
        );

        Ok(removed)
    }

    /// Remove every provider of `T` carrying the qualifiers declared on component `C`.
    pub fn unregister_component<T: ?Sized + 'static, C: Component>(&self) -> Result<usize> {
        self.unregister::<T>(&C::markers().resolved_qualifiers())
    }

    fn check_configurable(&self, operation: &str) -> Result<()> {
        match self.state() {
            ContainerState::Unconfigured => Ok(()),
            state => Err(DiError::Configuration(format!(
                "cannot {operation} definitions: container is {state}"
            ))),
        }
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Validate every component definition and freeze the definition set.
    ///
    /// Runs once; resolution calls it implicitly. A validation failure is
    /// returned again by every later call.
    pub fn initialize(&self) -> Result<()> {
        if self.state() == ContainerState::Destroyed {
            return Err(DiError::Configuration("container has been destroyed".into()));
        }
        self.initialized.get_or_init(|| self.validate()).clone()
    }

    fn validate(&self) -> Result<()> {
        self.transition(ContainerState::Unconfigured, ContainerState::Validating);

        #[cfg(feature = "logging")]
        info!(
            target: "object_factory",
            service_count = self.registry.len(),
            "Validating object definitions"
        );

        for instance in self.registry.snapshot() {
            if let Source::ReflectiveType(reflective) = instance.definition().source() {
                if let Err(error) = scanner::validate(&self.registry, reflective) {
                    #[cfg(feature = "logging")]
                    warn!(
                        target: "object_factory",
                        service = reflective.key().name(),
                        error = %error,
                        "Definition validation failed"
                    );

                    self.transition(ContainerState::Validating, ContainerState::Failed);
                    return Err(error);
                }
            }
        }

        self.transition(ContainerState::Validating, ContainerState::Ready);

        #[cfg(feature = "logging")]
        info!(
            target: "object_factory",
            service_count = self.registry.len(),
            "Container ready"
        );

        Ok(())
    }

    #[inline]
    fn ensure_ready(&self) -> Result<()> {
        match self.state() {
            ContainerState::Ready => Ok(()),
            ContainerState::Destroyed => Err(DiError::Configuration(
                "cannot resolve objects: container has been destroyed".into(),
            )),
            _ => self.initialize(),
        }
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve the unique provider of `T` registered without qualifiers.
    #[inline]
    pub fn get_object<T: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<T>> {
        self.get_object_with::<T>(&Qualifiers::new())
    }

    /// Resolve the unique provider of `T` whose qualifiers equal `qualifiers`.
    ///
    /// Requesting `Container` returns this container.
    pub fn get_object_with<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifiers: &Qualifiers,
    ) -> Result<Arc<T>> {
        self.ensure_ready()?;

        if TypeId::of::<T>() == TypeId::of::<Container>() {
            let this: Box<dyn Any> = Box::new(Arc::new(self.clone()));
            return this
                .downcast::<Arc<T>>()
                .map(|arc| *arc)
                .map_err(|_| DiError::reflection("Container::get_object", "self resolution"));
        }

        let key = TypeKey::of::<T>();
        let instance = self.registry.find_unique(&key, qualifiers).inspect_err(|_error| {
            #[cfg(feature = "logging")]
            debug!(
                target: "object_factory",
                service = key.name(),
                qualifiers = %qualifiers,
                error = %_error,
                "Unique resolution failed"
            );
        })?;

        #[cfg(feature = "logging")]
        trace!(
            target: "object_factory",
            service = key.name(),
            qualifiers = %qualifiers,
            "Resolving object"
        );

        self.resolve_instance::<T>(&instance, &key)
    }

    /// Resolve `T`, returning `None` on any failure.
    #[inline]
    pub fn try_get_object<T: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.get_object::<T>().ok()
    }

    /// A lazy handle over every provider of `T` carrying at least `qualifiers`.
    ///
    /// Never ambiguous; nothing is materialized until the selection is iterated.
    pub fn select<T: ?Sized + Send + Sync + 'static>(&self, qualifiers: &Qualifiers) -> Result<Selection<T>> {
        self.ensure_ready()?;
        let matches = self.registry.find_all(&TypeKey::of::<T>(), qualifiers);

        #[cfg(feature = "logging")]
        trace!(
            target: "object_factory",
            service = std::any::type_name::<T>(),
            qualifiers = %qualifiers,
            matches = matches.len(),
            "Selecting objects"
        );

        Ok(Selection::new(self.clone(), qualifiers.clone(), matches))
    }

    pub(crate) fn resolve_instance<T: ?Sized + Send + Sync + 'static>(
        &self,
        instance: &ObjectInstance,
        key: &TypeKey,
    ) -> Result<Arc<T>> {
        self.ensure_ready()?;
        let value = instance.get_instance(self)?;
        let definition = instance.definition();
        definition
            .cast(key, &value)
            .and_then(|boxed| boxed.downcast::<Arc<T>>().ok())
            .map(|typed| *typed)
            .ok_or_else(|| {
                DiError::reflection(
                    format!("{}::cast", definition.implementation()),
                    format!("value is not exposed as {key}"),
                )
            })
    }

    // =========================================================================
    // Injection and lifecycle
    // =========================================================================

    /// Apply field and method injection to an object the container did not build.
    pub fn inject<T: InjectionTarget>(&self, target: &mut T) -> Result<()> {
        self.ensure_ready()?;
        scanner::inject(self, target)
    }

    /// Run `T`'s post-construct hooks, own hooks first.
    pub fn post_construct<T: InjectionTarget>(&self, target: &T) -> Result<()> {
        T::lifecycle().run_post_construct(std::any::type_name::<T>(), target)
    }

    /// Run `T`'s pre-destroy hooks, own hooks first.
    pub fn pre_destroy<T: InjectionTarget>(&self, target: &T) -> Result<()> {
        T::lifecycle().run_pre_destroy(std::any::type_name::<T>(), target)
    }

    /// Tear down every cached singleton, newest registration first.
    ///
    /// Components run their pre-destroy hooks and producers their teardown.
    /// Every cached value is visited even if one fails; the first failure is
    /// returned. Calling this again is a no-op.
    pub fn destroy(&self) -> Result<()> {
        let previous = ContainerState::from_u8(
            self.state.swap(ContainerState::Destroyed as u8, Ordering::AcqRel),
        );
        if previous == ContainerState::Destroyed {
            return Ok(());
        }

        let mut first_error = None;
        let mut destroyed = 0usize;
        for instance in self.registry.snapshot().iter().rev() {
            let Some(value) = instance.clear_instance() else {
                continue;
            };
            destroyed += 1;
            if let Err(error) = instance.definition().teardown(&value) {
                #[cfg(feature = "logging")]
                warn!(
                    target: "object_factory",
                    service = instance.definition().implementation().name(),
                    error = %error,
                    "Teardown failed"
                );
                first_error.get_or_insert(error);
            }
        }
        self.registry.clear_lookups();

        #[cfg(feature = "logging")]
        info!(
            target: "object_factory",
            destroyed,
            previous_state = %previous,
            "Container destroyed"
        );
        #[cfg(not(feature = "logging"))]
        let _ = destroyed;

        first_error.map_or(Ok(()), Err)
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Registered definitions, in registration order.
    pub fn definitions(&self) -> Vec<Arc<Definition>> {
        self.registry
            .snapshot()
            .iter()
            .map(|i| i.shared_definition())
            .collect()
    }

    /// Whether any provider exposes `T`.
    #[inline]
    pub fn contains<T: ?Sized + 'static>(&self) -> bool {
        !self
            .registry
            .find_all(&TypeKey::of::<T>(), &Qualifiers::new())
            .is_empty()
    }

    /// Number of registered definitions.
    #[inline]
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Whether nothing is registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> ContainerState {
        ContainerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether two handles share the same container.
    #[inline]
    pub fn ptr_eq(&self, other: &Container) -> bool {
        Arc::ptr_eq(&self.registry, &other.registry)
    }

    /// Move from `from` to `to`; a concurrent `destroy()` wins.
    #[inline]
    fn transition(&self, from: ContainerState, to: ContainerState) {
        let _ = self
            .state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire);
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("state", &self.state())
            .field("service_count", &self.registry.len())
            .finish()
    }
}
