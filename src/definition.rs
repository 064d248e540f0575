//! Provider definitions
//!
//! A [`Definition`] is the immutable description of one registered provider.
//! It is built from a [`Registration`] when handed to the container.

use crate::injection::{Component, Constructor, InjectionPoints};
use crate::scanner;
use crate::{BoxError, Container, DiError, Injectable, Markers, Producer, Qualifier, Qualifiers, Result, Scope};
use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// The universal object type. Querying for it matches every provider.
pub type AnyObject = dyn Any + Send + Sync;

/// A materialized value, erased to its implementation type.
pub(crate) type AnyArc = Arc<AnyObject>;

type CastFn = Arc<dyn Fn(&AnyArc) -> Option<Box<dyn Any + Send + Sync>> + Send + Sync>;
type ProduceFn = Arc<dyn Fn(&Container) -> Result<AnyArc> + Send + Sync>;
type DestroyFn = Arc<dyn Fn(&AnyArc) -> Result<()> + Send + Sync>;

/// Identifier of an exposed type.
///
/// Works for unsized types, so trait objects such as `dyn Logger` can be
/// exposed and requested.
#[derive(Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    /// Key of `T`
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// The wildcard key, see [`AnyObject`]
    #[inline]
    pub fn any() -> Self {
        Self::of::<AnyObject>()
    }

    /// Whether this is the wildcard key
    #[inline]
    pub fn is_wildcard(&self) -> bool {
        self.id == TypeId::of::<AnyObject>()
    }

    /// Underlying `TypeId`
    #[inline]
    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Type name for diagnostics
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// One type a provider is resolvable as, with the cast from the implementation.
#[derive(Clone)]
struct Exposure {
    key: TypeKey,
    cast: CastFn,
}

impl Exposure {
    fn identity<T: Injectable>() -> Self {
        Self {
            key: TypeKey::of::<T>(),
            cast: Arc::new(|value: &AnyArc| {
                let typed = Arc::clone(value).downcast::<T>().ok()?;
                Some(Box::new(typed) as Box<dyn Any + Send + Sync>)
            }),
        }
    }

    fn cast<T: Injectable, U: ?Sized + Send + Sync + 'static>(cast: fn(Arc<T>) -> Arc<U>) -> Self {
        Self {
            key: TypeKey::of::<U>(),
            cast: Arc::new(move |value: &AnyArc| {
                let typed = Arc::clone(value).downcast::<T>().ok()?;
                Some(Box::new(cast(typed)) as Box<dyn Any + Send + Sync>)
            }),
        }
    }
}

/// A caller-supplied factory, erased.
#[derive(Clone)]
pub struct ProducerSource {
    produce: ProduceFn,
    destroy: Option<DestroyFn>,
}

impl ProducerSource {
    pub(crate) fn produce(&self, container: &Container) -> Result<AnyArc> {
        (self.produce)(container)
    }

    pub(crate) fn destroy(&self, value: &AnyArc) -> Result<()> {
        match &self.destroy {
            Some(destroy) => destroy(value),
            None => Ok(()),
        }
    }
}

/// A [`Component`] type the container constructs itself.
#[derive(Clone, Copy)]
pub struct ReflectiveType {
    key: TypeKey,
    constructor: fn() -> Constructor,
    injection_points: fn() -> InjectionPoints,
    build: fn(&Container) -> Result<AnyArc>,
    destroy: fn(&AnyArc) -> Result<()>,
}

impl ReflectiveType {
    fn of<C: Component>() -> Self {
        Self {
            key: TypeKey::of::<C>(),
            constructor: C::constructor,
            injection_points: C::injection_points,
            build: scanner::build_component::<C>,
            destroy: scanner::destroy_component::<C>,
        }
    }

    /// Implementation type
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    /// The constructor the component declares
    pub fn constructor(&self) -> Constructor {
        (self.constructor)()
    }

    /// Fields and injection methods the component declares
    pub fn injection_points(&self) -> InjectionPoints {
        (self.injection_points)()
    }

    pub(crate) fn build(&self, container: &Container) -> Result<AnyArc> {
        (self.build)(container)
    }

    pub(crate) fn destroy(&self, value: &AnyArc) -> Result<()> {
        (self.destroy)(value)
    }
}

/// How a definition materializes its value.
#[derive(Clone)]
pub enum Source {
    /// Caller-supplied factory owning its own construction
    Producer(ProducerSource),
    /// Container-driven construction of a component type
    ReflectiveType(ReflectiveType),
}

/// Immutable description of one registered provider.
#[derive(Clone)]
pub struct Definition {
    types: Vec<Exposure>,
    qualifiers: Qualifiers,
    scope: Scope,
    source: Source,
    implementation: TypeKey,
    teardown: Option<DestroyFn>,
}

impl Definition {
    /// Exposed types, implementation type first
    pub fn types(&self) -> impl Iterator<Item = &TypeKey> {
        self.types.iter().map(|e| &e.key)
    }

    /// Qualifiers
    pub fn qualifiers(&self) -> &Qualifiers {
        &self.qualifiers
    }

    /// Scope
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Source
    pub fn source(&self) -> &Source {
        &self.source
    }

    /// Implementation type
    pub fn implementation(&self) -> &TypeKey {
        &self.implementation
    }

    /// Whether this definition is resolvable as `key`; the wildcard matches everything.
    #[inline]
    pub fn has_type(&self, key: &TypeKey) -> bool {
        key.is_wildcard() || self.types.iter().any(|e| e.key == *key)
    }

    /// Cast a materialized value to the boxed `Arc<U>` for the exposed type `key`.
    pub(crate) fn cast(&self, key: &TypeKey, value: &AnyArc) -> Option<Box<dyn Any + Send + Sync>> {
        if key.is_wildcard() {
            return Some(Box::new(Arc::clone(value)));
        }
        let exposure = self.types.iter().find(|e| e.key == *key)?;
        (exposure.cast)(value)
    }

    pub(crate) fn teardown(&self, value: &AnyArc) -> Result<()> {
        let own = match &self.source {
            Source::Producer(p) => p.destroy(value),
            Source::ReflectiveType(r) => r.destroy(value),
        };
        match &self.teardown {
            Some(extra) => own.and(extra(value)),
            None => own,
        }
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match &self.source {
            Source::Producer(_) => "producer",
            Source::ReflectiveType(_) => "reflective",
        };
        f.debug_struct("Definition")
            .field("implementation", &self.implementation)
            .field("types", &self.types().collect::<Vec<_>>())
            .field("qualifiers", &self.qualifiers)
            .field("scope", &self.scope)
            .field("source", &source)
            .finish()
    }
}

/// Builder for one provider, handed to [`Container::register`].
///
/// Scope and qualifiers left unspecified are taken from the provider's
/// declarative [`Markers`].
///
/// # Examples
///
/// ```rust
/// use object_factory::{Container, Qualifier, Registration};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct English;
///
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
///
/// let container = Container::new();
/// container
///     .register(
///         Registration::producer(|_| Ok(English))
///             .expose::<dyn Greeter>(|e| e)
///             .qualifier(Qualifier::named("en")),
///     )
///     .unwrap();
///
/// let greeter: Arc<dyn Greeter> = container
///     .get_object_with::<dyn Greeter>(&Qualifier::named("en").into())
///     .unwrap();
/// assert_eq!(greeter.greet(), "hello");
/// ```
pub struct Registration<T> {
    types: Vec<Exposure>,
    scope: Option<Scope>,
    qualifiers: Option<Qualifiers>,
    markers: Markers,
    source: Source,
    teardown: Option<DestroyFn>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> Registration<T> {
    fn with_source(source: Source, markers: Markers) -> Self {
        Self {
            types: vec![Exposure::identity::<T>()],
            scope: None,
            qualifiers: None,
            markers,
            source,
            teardown: None,
            _marker: PhantomData,
        }
    }

    /// Register a component type; the container constructs and injects it.
    pub fn component() -> Self
    where
        T: Component,
    {
        Self::with_source(Source::ReflectiveType(ReflectiveType::of::<T>()), T::markers())
    }

    /// Register a producer closure.
    pub fn producer<F>(produce: F) -> Self
    where
        F: Fn(&Container) -> std::result::Result<T, BoxError> + Send + Sync + 'static,
    {
        let member = format!("{}::produce", std::any::type_name::<T>());
        let produce: ProduceFn = Arc::new(move |container: &Container| {
            produce(container)
                .map(|value| Arc::new(value) as AnyArc)
                .map_err(|e| DiError::wrap(member.clone(), e))
        });
        Self::with_source(
            Source::Producer(ProducerSource {
                produce,
                destroy: None,
            }),
            Markers::new(),
        )
    }

    /// Register a [`Producer`] implementation, with its markers and teardown.
    pub fn from_producer<P: Producer<T>>(producer: P) -> Self {
        let markers = producer.markers();
        let producer = Arc::new(producer);
        let type_name = std::any::type_name::<T>();

        let for_produce = Arc::clone(&producer);
        let produce: ProduceFn = Arc::new(move |container: &Container| {
            for_produce
                .produce(container)
                .map(|value| Arc::new(value) as AnyArc)
                .map_err(|e| DiError::wrap(format!("{type_name}::produce"), e))
        });
        let destroy: DestroyFn = Arc::new(move |value: &AnyArc| {
            let typed = value
                .downcast_ref::<T>()
                .ok_or_else(|| DiError::reflection(format!("{type_name}::destroy"), "type mismatch"))?;
            producer
                .destroy(typed)
                .map_err(|e| DiError::wrap(format!("{type_name}::destroy"), e))
        });
        Self::with_source(
            Source::Producer(ProducerSource {
                produce,
                destroy: Some(destroy),
            }),
            markers,
        )
    }

    /// Register a ready-made value; every resolution returns it.
    pub fn instance(value: T) -> Self {
        let shared: AnyArc = Arc::new(value);
        let produce: ProduceFn = Arc::new(move |_: &Container| Ok(Arc::clone(&shared)));
        Self::with_source(
            Source::Producer(ProducerSource {
                produce,
                destroy: None,
            }),
            Markers::new(),
        )
    }

    /// Also expose the provider as `U`, typically a trait object it implements.
    pub fn expose<U: ?Sized + Send + Sync + 'static>(mut self, cast: fn(Arc<T>) -> Arc<U>) -> Self {
        let exposure = Exposure::cast::<T, U>(cast);
        match self.types.iter_mut().find(|e| e.key == exposure.key) {
            Some(existing) => *existing = exposure,
            None => self.types.push(exposure),
        }
        self
    }

    /// Set the scope explicitly
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Shorthand for `scope(Scope::Singleton)`
    pub fn singleton(self) -> Self {
        self.scope(Scope::Singleton)
    }

    /// Shorthand for `scope(Scope::Prototype)`
    pub fn prototype(self) -> Self {
        self.scope(Scope::Prototype)
    }

    /// Add a qualifier; any explicit qualifier replaces the declared markers
    pub fn qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.get_or_insert_with(Qualifiers::new).insert(qualifier);
        self
    }

    /// Set the qualifier set explicitly
    pub fn qualifiers(mut self, qualifiers: Qualifiers) -> Self {
        self.qualifiers = Some(qualifiers);
        self
    }

    /// Teardown run on `destroy()` after the source's own teardown
    pub fn on_destroy<F>(mut self, teardown: F) -> Self
    where
        F: Fn(&T) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        let member = format!("{}::on_destroy", std::any::type_name::<T>());
        self.teardown = Some(Arc::new(move |value: &AnyArc| {
            let typed = value
                .downcast_ref::<T>()
                .ok_or_else(|| DiError::reflection(member.clone(), "type mismatch"))?;
            teardown(typed).map_err(|e| DiError::wrap(member.clone(), e))
        }));
        self
    }

    pub(crate) fn into_definition(self) -> Definition {
        let scope = self.scope.unwrap_or_else(|| self.markers.resolved_scope());
        let qualifiers = self
            .qualifiers
            .unwrap_or_else(|| self.markers.resolved_qualifiers());
        Definition {
            types: self.types,
            qualifiers,
            scope,
            source: self.source,
            implementation: TypeKey::of::<T>(),
            teardown: self.teardown,
        }
    }
}
