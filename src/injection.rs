//! Injection points and the traits through which types describe them
//!
//! Rust has no runtime reflection, so a type declares its injection points
//! itself: [`Component`] for types the container constructs, and
//! [`InjectionTarget`] for any value that accepts field or method injection.
//! The `derive` feature generates both from attributes.

use crate::definition::TypeKey;
use crate::{BoxError, Container, DiError, Markers, Qualifier, Qualifiers, Result, Selection};
use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::VecDeque;
use std::sync::Arc;

type ResolveFn = fn(&Container, &Qualifiers) -> Result<Box<dyn Any + Send + Sync>>;

/// What kind of value a dependency asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// A provided object, `Arc<T>`
    Object,
    /// The container itself
    Container,
    /// A lazy handle over matching providers, `Selection<T>`
    Selection,
}

/// A required type plus the qualifiers it must be provided with.
#[derive(Clone)]
pub struct Dependency {
    kind: DependencyKind,
    key: TypeKey,
    qualifiers: Qualifiers,
    resolve: ResolveFn,
}

fn resolve_object<T>(container: &Container, qualifiers: &Qualifiers) -> Result<Box<dyn Any + Send + Sync>>
where
    T: ?Sized + Send + Sync + 'static,
{
    let value: Arc<T> = container.get_object_with::<T>(qualifiers)?;
    Ok(Box::new(value))
}

// Always boxed as `Arc<Container>`, the shape of an object dependency on `Container`
fn resolve_container(container: &Container, _: &Qualifiers) -> Result<Box<dyn Any + Send + Sync>> {
    Ok(Box::new(Arc::new(container.clone())))
}

fn resolve_selection<T>(container: &Container, qualifiers: &Qualifiers) -> Result<Box<dyn Any + Send + Sync>>
where
    T: ?Sized + Send + Sync + 'static,
{
    let selection: Selection<T> = container.select::<T>(qualifiers)?;
    Ok(Box::new(selection))
}

impl Dependency {
    /// Depend on a provided `Arc<T>`
    pub fn object<T: ?Sized + Send + Sync + 'static>() -> Self {
        if TypeId::of::<T>() == TypeId::of::<Container>() {
            return Self::container();
        }
        Self {
            kind: DependencyKind::Object,
            key: TypeKey::of::<T>(),
            qualifiers: Qualifiers::new(),
            resolve: resolve_object::<T>,
        }
    }

    /// Depend on the container itself
    pub fn container() -> Self {
        Self {
            kind: DependencyKind::Container,
            key: TypeKey::of::<Container>(),
            qualifiers: Qualifiers::new(),
            resolve: resolve_container,
        }
    }

    /// Depend on a lazy [`Selection<T>`] instead of an eager value
    pub fn selection<T: ?Sized + Send + Sync + 'static>() -> Self {
        Self {
            kind: DependencyKind::Selection,
            key: TypeKey::of::<T>(),
            qualifiers: Qualifiers::new(),
            resolve: resolve_selection::<T>,
        }
    }

    /// Require a qualifier
    pub fn qualified(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.insert(qualifier);
        self
    }

    /// Replace the qualifier set
    pub fn with_qualifiers(mut self, qualifiers: Qualifiers) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    /// Kind of value requested
    pub fn kind(&self) -> DependencyKind {
        self.kind
    }

    /// Requested type
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    /// Requested qualifiers
    pub fn qualifiers(&self) -> &Qualifiers {
        &self.qualifiers
    }

    pub(crate) fn resolve(&self, container: &Container, member: String) -> Result<Injected> {
        let value = (self.resolve)(container, &self.qualifiers)?;
        Ok(Injected { member, value })
    }
}

impl std::fmt::Debug for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependency")
            .field("kind", &self.kind)
            .field("type", &self.key.name())
            .field("qualifiers", &self.qualifiers)
            .finish()
    }
}

/// A place where the container supplies a value.
#[derive(Debug, Clone)]
pub enum InjectionPoint {
    /// Parameter of the injecting constructor
    ConstructorParam { index: usize, dependency: Dependency },
    /// Field assigned after construction
    Field { name: Cow<'static, str>, dependency: Dependency },
    /// Method invoked after field injection, with resolved parameters
    Method { name: Cow<'static, str>, parameters: Vec<Dependency> },
}

impl InjectionPoint {
    /// Human-readable location, used in error messages
    pub fn describe(&self, owner: &str) -> String {
        match self {
            Self::ConstructorParam { index, .. } => format!("{owner}::new(arg {index})"),
            Self::Field { name, .. } => format!("{owner}::{name}"),
            Self::Method { name, .. } => format!("{owner}::{name}()"),
        }
    }
}

/// Fields and injection methods of a type, own points first, then inherited ones.
#[derive(Debug, Clone, Default)]
pub struct InjectionPoints {
    points: Vec<InjectionPoint>,
}

impl InjectionPoints {
    /// No injection points
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an injected field
    pub fn field(mut self, name: impl Into<Cow<'static, str>>, dependency: Dependency) -> Self {
        self.points.push(InjectionPoint::Field {
            name: name.into(),
            dependency,
        });
        self
    }

    /// Declare an injection method and its parameters
    pub fn method(mut self, name: impl Into<Cow<'static, str>>, parameters: Vec<Dependency>) -> Self {
        self.points.push(InjectionPoint::Method {
            name: name.into(),
            parameters,
        });
        self
    }

    /// Append the points of an embedded base type
    pub fn inherit(mut self, base: InjectionPoints) -> Self {
        self.points.extend(base.points);
        self
    }

    pub(crate) fn fields(&self) -> impl Iterator<Item = &InjectionPoint> {
        self.points
            .iter()
            .filter(|p| matches!(p, InjectionPoint::Field { .. }))
    }

    pub(crate) fn methods(&self) -> impl Iterator<Item = &InjectionPoint> {
        self.points
            .iter()
            .filter(|p| matches!(p, InjectionPoint::Method { .. }))
    }

    /// Number of declared points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no points are declared
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// The constructor the container uses to build a component.
#[derive(Debug, Clone, Default)]
pub enum Constructor {
    /// Zero-argument construction
    #[default]
    NoArgs,
    /// Constructor injection with these parameters, in order
    Inject(Vec<Dependency>),
}

impl Constructor {
    /// Injecting constructor
    pub fn inject(parameters: Vec<Dependency>) -> Self {
        Self::Inject(parameters)
    }

    pub(crate) fn points(&self) -> Vec<InjectionPoint> {
        match self {
            Self::NoArgs => Vec::new(),
            Self::Inject(params) => params
                .iter()
                .enumerate()
                .map(|(index, dependency)| InjectionPoint::ConstructorParam {
                    index,
                    dependency: dependency.clone(),
                })
                .collect(),
        }
    }
}

/// A resolved value on its way into an injection point.
pub struct Injected {
    member: String,
    value: Box<dyn Any + Send + Sync>,
}

impl Injected {
    fn downcast<V: 'static>(self) -> Result<V> {
        let Injected { member, value } = self;
        match value.downcast::<V>() {
            Ok(v) => Ok(*v),
            Err(_) => Err(DiError::reflection(
                member,
                format!("argument type mismatch, expected {}", std::any::type_name::<V>()),
            )),
        }
    }

    /// Take the value as `Arc<T>`
    pub fn into_object<T: ?Sized + Send + Sync + 'static>(self) -> Result<Arc<T>> {
        self.downcast::<Arc<T>>()
    }

    /// Take the value as the container
    pub fn into_container(self) -> Result<Container> {
        self.downcast::<Arc<Container>>().map(|container| Container::clone(&container))
    }

    /// Take the value as a lazy selection
    pub fn into_selection<T: ?Sized + Send + Sync + 'static>(self) -> Result<Selection<T>> {
        self.downcast::<Selection<T>>()
    }

    /// Injection point this value was resolved for
    pub fn member(&self) -> &str {
        &self.member
    }
}

/// Resolved constructor or method arguments, consumed in declaration order.
pub struct Arguments {
    member: String,
    values: VecDeque<Injected>,
}

impl Arguments {
    pub(crate) fn new(member: String, values: Vec<Injected>) -> Self {
        Self {
            member,
            values: values.into(),
        }
    }

    fn next(&mut self) -> Result<Injected> {
        self.values
            .pop_front()
            .ok_or_else(|| DiError::reflection(self.member.clone(), "wrong number of arguments"))
    }

    /// Next argument as `Arc<T>`
    pub fn next_object<T: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Arc<T>> {
        self.next()?.into_object()
    }

    /// Next argument as the container
    pub fn next_container(&mut self) -> Result<Container> {
        self.next()?.into_container()
    }

    /// Next argument as a lazy selection
    pub fn next_selection<T: ?Sized + Send + Sync + 'static>(&mut self) -> Result<Selection<T>> {
        self.next()?.into_selection()
    }

    /// Remaining arguments
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether every argument was consumed
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

type Hook<T> = Arc<dyn Fn(&T) -> std::result::Result<(), BoxError> + Send + Sync>;

/// Zero-argument lifecycle hooks of a type, own hooks first, then inherited ones.
pub struct Lifecycle<T> {
    post_construct: Vec<(Cow<'static, str>, Hook<T>)>,
    pre_destroy: Vec<(Cow<'static, str>, Hook<T>)>,
}

impl<T: 'static> Lifecycle<T> {
    /// No hooks
    pub fn new() -> Self {
        Self {
            post_construct: Vec::new(),
            pre_destroy: Vec::new(),
        }
    }

    /// Add a hook run after construction and injection
    pub fn post_construct<F>(mut self, name: impl Into<Cow<'static, str>>, hook: F) -> Self
    where
        F: Fn(&T) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.post_construct.push((name.into(), Arc::new(hook)));
        self
    }

    /// Add a hook run on teardown
    pub fn pre_destroy<F>(mut self, name: impl Into<Cow<'static, str>>, hook: F) -> Self
    where
        F: Fn(&T) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.pre_destroy.push((name.into(), Arc::new(hook)));
        self
    }

    /// Append the hooks of an embedded base type, reached through `project`
    pub fn inherit<B: 'static>(mut self, project: fn(&T) -> &B, base: Lifecycle<B>) -> Self {
        for (name, hook) in base.post_construct {
            let lifted: Hook<T> = Arc::new(move |t: &T| hook(project(t)));
            self.post_construct.push((name, lifted));
        }
        for (name, hook) in base.pre_destroy {
            let lifted: Hook<T> = Arc::new(move |t: &T| hook(project(t)));
            self.pre_destroy.push((name, lifted));
        }
        self
    }

    pub(crate) fn run_post_construct(&self, owner: &str, target: &T) -> Result<()> {
        for (name, hook) in &self.post_construct {
            hook(target).map_err(|e| DiError::wrap(format!("{owner}::{name}()"), e))?;
        }
        Ok(())
    }

    pub(crate) fn run_pre_destroy(&self, owner: &str, target: &T) -> Result<()> {
        for (name, hook) in &self.pre_destroy {
            hook(target).map_err(|e| DiError::wrap(format!("{owner}::{name}()"), e))?;
        }
        Ok(())
    }
}

impl<T: 'static> Default for Lifecycle<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// A value that accepts field and method injection.
///
/// Implement this for external objects passed to
/// [`Container::inject`](crate::Container::inject); every [`Component`] is
/// also an injection target.
///
/// # Examples
///
/// ```rust
/// use object_factory::{BoxError, Container, Dependency, Injected, InjectionPoints, InjectionTarget, Registration};
/// use std::sync::Arc;
///
/// struct Clock;
///
/// #[derive(Default)]
/// struct Handler {
///     clock: Option<Arc<Clock>>,
/// }
///
/// impl InjectionTarget for Handler {
///     fn injection_points() -> InjectionPoints {
///         InjectionPoints::new().field("clock", Dependency::object::<Clock>())
///     }
///
///     fn set_field(&mut self, field: &str, value: Injected) -> Result<(), BoxError> {
///         match field {
///             "clock" => self.clock = Some(value.into_object()?),
///             _ => return Err(format!("unknown field {field}").into()),
///         }
///         Ok(())
///     }
/// }
///
/// let container = Container::new();
/// container.register(Registration::instance(Clock)).unwrap();
///
/// let mut handler = Handler::default();
/// container.inject(&mut handler).unwrap();
/// assert!(handler.clock.is_some());
/// ```
pub trait InjectionTarget: Send + Sync + Sized + 'static {
    /// Injected fields and methods
    fn injection_points() -> InjectionPoints {
        InjectionPoints::new()
    }

    /// Assign a resolved value to a declared field
    fn set_field(&mut self, field: &str, _value: Injected) -> std::result::Result<(), BoxError> {
        Err(format!("no injectable field `{field}`").into())
    }

    /// Invoke a declared injection method with resolved arguments
    fn call_method(&mut self, method: &str, _args: Arguments) -> std::result::Result<(), BoxError> {
        Err(format!("no injection method `{method}`").into())
    }

    /// Post-construct and pre-destroy hooks
    fn lifecycle() -> Lifecycle<Self> {
        Lifecycle::new()
    }
}

/// A type the container constructs itself (the reflective source).
pub trait Component: InjectionTarget {
    /// Declared scope and qualifiers
    fn markers() -> Markers {
        Markers::new()
    }

    /// The constructor to use
    fn constructor() -> Constructor {
        Constructor::NoArgs
    }

    /// Build the value from the resolved constructor arguments
    fn construct(args: Arguments) -> std::result::Result<Self, BoxError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Base {
        log: parking_lot::Mutex<Vec<&'static str>>,
    }

    struct Derived {
        base: Base,
    }

    fn base_of(d: &Derived) -> &Base {
        &d.base
    }

    #[test]
    fn test_constructor_points() {
        let ctor = Constructor::inject(vec![
            Dependency::object::<String>(),
            Dependency::object::<u32>().qualified(Qualifier::named("port")),
        ]);
        let points = ctor.points();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].describe("app::Server"), "app::Server::new(arg 1)");
        assert!(Constructor::NoArgs.points().is_empty());
    }

    #[test]
    fn test_dependency_kinds() {
        assert_eq!(Dependency::object::<String>().kind(), DependencyKind::Object);
        assert_eq!(Dependency::object::<Container>().kind(), DependencyKind::Container);
        assert_eq!(Dependency::container().kind(), DependencyKind::Container);
        assert_eq!(Dependency::selection::<String>().kind(), DependencyKind::Selection);
    }

    #[test]
    fn test_inherited_points_follow_own_points() {
        let base = InjectionPoints::new().field("clock", Dependency::object::<u64>());
        let points = InjectionPoints::new()
            .field("name", Dependency::object::<String>())
            .method("configure", vec![Dependency::container()])
            .inherit(base);

        let fields: Vec<_> = points.fields().map(|p| p.describe("X")).collect();
        assert_eq!(fields, vec!["X::name", "X::clock"]);
        assert_eq!(points.methods().count(), 1);
    }

    #[test]
    fn test_lifecycle_inherit_runs_base_after_own() {
        let base = Lifecycle::<Base>::new().post_construct("base_init", |b: &Base| {
            b.log.lock().push("base");
            Ok(())
        });
        let lifecycle = Lifecycle::<Derived>::new()
            .post_construct("init", |d: &Derived| {
                d.base.log.lock().push("derived");
                Ok(())
            })
            .inherit(base_of, base);

        let value = Derived {
            base: Base {
                log: parking_lot::Mutex::new(Vec::new()),
            },
        };
        lifecycle.run_post_construct("Derived", &value).unwrap();
        assert_eq!(*value.base.log.lock(), vec!["derived", "base"]);
    }

    #[test]
    fn test_hook_failure_is_wrapped() {
        let lifecycle = Lifecycle::<u8>::new().pre_destroy("close", |_: &u8| Err("busy".into()));
        let err = lifecycle.run_pre_destroy("app::Conn", &1).unwrap_err();
        match err {
            DiError::Reflection { member, .. } => assert_eq!(member, "app::Conn::close()"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_argument_type_mismatch() {
        let mut args = Arguments::new(
            "X::new".into(),
            vec![Injected {
                member: "X::new(arg 0)".into(),
                value: Box::new(Arc::new(5u32)),
            }],
        );
        assert!(matches!(args.next_object::<String>(), Err(DiError::Reflection { .. })));
        assert!(args.next_object::<u32>().is_err());
    }

    #[test]
    fn test_container_dependency_forms_agree() {
        let container = Container::new();
        let resolve = |dependency: Dependency| dependency.resolve(&container, "X::new(arg 0)".into()).unwrap();

        let via_object = resolve(Dependency::object::<Container>());
        assert!(via_object.into_container().unwrap().ptr_eq(&container));

        let via_container = resolve(Dependency::container());
        assert!(via_container.into_object::<Container>().unwrap().ptr_eq(&container));

        let mut args = Arguments::new(
            "X::new".into(),
            vec![resolve(Dependency::object::<Container>()), resolve(Dependency::container())],
        );
        assert!(args.next_container().unwrap().ptr_eq(&container));
        assert!(args.next_object::<Container>().unwrap().ptr_eq(&container));
    }
}
