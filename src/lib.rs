//! # Object Factory - Qualifier-Aware Dependency Injection for Rust
//!
//! A thread-safe object container that resolves providers by type and
//! qualifiers, validates the whole dependency graph before handing out the
//! first object, and tears singletons down in reverse registration order.
//!
//! ## Features
//!
//! - **Qualified resolution** - Several providers of one type, told apart by [`Qualifier`]s
//! - **Fail-fast validation** - Unsatisfiable component graphs are rejected at [`Container::initialize`]
//! - **Singleton and prototype scopes** - Singletons are built once, even under contention
//! - **Trait exposure** - Resolve a provider as `dyn Trait` as well as its concrete type
//! - **Lazy selections** - [`Selection<T>`] defers materialization until iteration
//! - **Lifecycle hooks** - Post-construct and pre-destroy hooks, run in a defined order
//! - **Observable** - Optional tracing integration with JSON or pretty output
//!
//! ## Quick Start
//!
//! ```rust
//! use object_factory::{Container, Qualifier, Registration};
//!
//! struct Database {
//!     url: String,
//! }
//!
//! let container = Container::new();
//!
//! container
//!     .register(Registration::producer(|_| Ok(Database { url: "postgres://primary".into() })))
//!     .unwrap();
//! container
//!     .register(
//!         Registration::producer(|_| Ok(Database { url: "postgres://replica".into() }))
//!             .qualifier(Qualifier::named("replica")),
//!     )
//!     .unwrap();
//!
//! // Unique resolution compares qualifier sets exactly
//! let primary = container.get_object::<Database>().unwrap();
//! let replica = container
//!     .get_object_with::<Database>(&Qualifier::named("replica").into())
//!     .unwrap();
//! assert_eq!(primary.url, "postgres://primary");
//! assert_eq!(replica.url, "postgres://replica");
//!
//! // Plural selection accepts any superset of the requested qualifiers
//! let all = container.select::<Database>(&Default::default()).unwrap();
//! assert_eq!(all.len(), 2);
//! ```
//!
//! ## Components
//!
//! Types the container builds itself implement [`Component`] (or derive it
//! with the `derive` feature). Their constructor dependencies are checked
//! when the container initializes.
//!
//! ```rust
//! use object_factory::{Arguments, BoxError, Component, Constructor, Container, Dependency, InjectionTarget, Registration};
//! use std::sync::Arc;
//!
//! struct Config { name: &'static str }
//!
//! struct Greeter { config: Arc<Config> }
//!
//! impl InjectionTarget for Greeter {}
//!
//! impl Component for Greeter {
//!     fn constructor() -> Constructor {
//!         Constructor::inject(vec![Dependency::object::<Config>()])
//!     }
//!
//!     fn construct(mut args: Arguments) -> Result<Self, BoxError> {
//!         Ok(Greeter { config: args.next_object()? })
//!     }
//! }
//!
//! let container = Container::new();
//! container.register(Registration::<Greeter>::component()).unwrap();
//!
//! // Config was never registered: validation fails before anything is built
//! let err = container.initialize().unwrap_err();
//! assert!(err.is_unsatisfied());
//! ```
//!
//! ## Teardown
//!
//! [`Container::destroy`] visits cached singletons newest first, running
//! component pre-destroy hooks and producer teardowns. Prototypes are never
//! tracked and are not torn down.

mod container;
mod definition;
mod error;
mod injection;
mod instance;
#[cfg(feature = "logging")]
pub mod logging;
mod provider;
mod qualifier;
mod scanner;
mod selection;
mod storage;

pub use container::*;
pub use definition::{AnyObject, Definition, ProducerSource, ReflectiveType, Registration, Source, TypeKey};
pub use error::*;
pub use injection::*;
pub use provider::*;
pub use qualifier::*;
pub use selection::{Iter as SelectionIter, Selection};

#[cfg(feature = "derive")]
pub use object_factory_derive::Component;

// Re-export tracing macros for convenience when logging feature is enabled
#[cfg(feature = "logging")]
pub use tracing::{debug, error, info, trace, warn};

// Re-export for convenience
pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        AnyObject, Arguments, BoxError, Component, Constructor, Container, Dependency, DiError,
        Injectable, Injected, InjectionPoints, InjectionTarget, Lifecycle, Markers, Producer,
        Qualifier, Qualifiers, Registration, Result, Scope, Selection, Stereotype,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Database {
        url: String,
    }

    struct UserService {
        db: Arc<Database>,
    }

    impl InjectionTarget for UserService {}

    impl Component for UserService {
        fn markers() -> Markers {
            Markers::new().scope(Scope::Prototype)
        }

        fn constructor() -> Constructor {
            Constructor::inject(vec![Dependency::object::<Database>()])
        }

        fn construct(mut args: Arguments) -> std::result::Result<Self, BoxError> {
            Ok(UserService {
                db: args.next_object()?,
            })
        }
    }

    #[test]
    fn test_instance_registration() {
        let container = Container::new();
        container
            .register(Registration::instance(Database { url: "test".into() }))
            .unwrap();

        let db = container.get_object::<Database>().unwrap();
        assert_eq!(db.url, "test");
    }

    #[test]
    fn test_component_markers_set_scope() {
        let container = Container::new();
        container
            .register(Registration::instance(Database { url: "test".into() }))
            .unwrap();
        container.register(Registration::<UserService>::component()).unwrap();

        let a = container.get_object::<UserService>().unwrap();
        let b = container.get_object::<UserService>().unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(Arc::ptr_eq(&a.db, &b.db));
    }

    #[test]
    fn test_prototype_produces_each_time() {
        static COUNTER: AtomicU32 = AtomicU32::new(0);

        struct RequestId(u32);

        let container = Container::new();
        container
            .register(Registration::producer(|_| Ok(RequestId(COUNTER.fetch_add(1, Ordering::SeqCst)))).prototype())
            .unwrap();

        let r1 = container.get_object::<RequestId>().unwrap();
        let r2 = container.get_object::<RequestId>().unwrap();
        assert_ne!(r1.0, r2.0);
    }

    #[test]
    fn test_singleton_is_lazy() {
        static CREATED: AtomicU32 = AtomicU32::new(0);

        struct LazyService;

        let container = Container::new();
        container
            .register(Registration::producer(|_| {
                CREATED.fetch_add(1, Ordering::SeqCst);
                Ok(LazyService)
            }))
            .unwrap();
        container.initialize().unwrap();
        assert_eq!(CREATED.load(Ordering::SeqCst), 0);

        let _ = container.get_object::<LazyService>().unwrap();
        let _ = container.get_object::<LazyService>().unwrap();
        assert_eq!(CREATED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_prelude_covers_common_use() {
        use crate::prelude::*;

        let container = Container::default();
        container
            .register(Registration::instance(7u16).qualifier(Qualifier::named("port")))
            .unwrap();
        let port: Arc<u16> = container
            .get_object_with::<u16>(&Qualifiers::from(Qualifier::named("port")))
            .unwrap();
        assert_eq!(*port, 7);
    }
}
