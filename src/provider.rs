//! Provider traits and declarative markers
//!
//! These describe what the container may hold, how long a materialized value
//! lives, and how caller-supplied factories plug in.

use crate::qualifier::{Qualifier, QualifierMatcher, Qualifiers, Stereotype};
use crate::{BoxError, Container};

/// Marker trait for types the container can hold.
///
/// This is automatically implemented for all types that are `Send + Sync + 'static`.
/// You never need to implement this manually.
pub trait Injectable: Send + Sync + 'static {}

// Blanket implementation - everything that's Send + Sync + 'static is Injectable
impl<T: Send + Sync + 'static> Injectable for T {}

/// How long a materialized value lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    /// Materialized once on first resolution, cached until `destroy()`
    #[default]
    Singleton,

    /// Materialized fresh on every resolution, never cached
    Prototype,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scope::Singleton => f.write_str("singleton"),
            Scope::Prototype => f.write_str("prototype"),
        }
    }
}

/// Declarative metadata attached to a provider.
///
/// Registration falls back to these markers for any scope or qualifier it
/// does not specify explicitly.
///
/// # Examples
///
/// ```rust
/// use object_factory::{Markers, Qualifier, Scope};
///
/// let markers = Markers::new()
///     .scope(Scope::Prototype)
///     .qualifier(Qualifier::named("audit"));
///
/// assert_eq!(markers.resolved_scope(), Scope::Prototype);
/// assert_eq!(markers.resolved_qualifiers().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Markers {
    scope: Option<Scope>,
    qualifiers: Qualifiers,
    stereotypes: Vec<Stereotype>,
}

impl Markers {
    /// No markers: singleton scope, no qualifiers
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the scope
    #[inline]
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Declare a qualifier
    #[inline]
    pub fn qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.insert(qualifier);
        self
    }

    /// Attach a stereotype
    #[inline]
    pub fn stereotype(mut self, stereotype: Stereotype) -> Self {
        self.stereotypes.push(stereotype);
        self
    }

    /// Scope after stereotype expansion, defaulting to singleton
    pub fn resolved_scope(&self) -> Scope {
        QualifierMatcher::expand(&self.qualifiers, self.scope, &self.stereotypes)
            .1
            .unwrap_or_default()
    }

    /// Qualifiers after stereotype expansion
    pub fn resolved_qualifiers(&self) -> Qualifiers {
        QualifierMatcher::expand(&self.qualifiers, self.scope, &self.stereotypes).0
    }
}

/// A caller-supplied factory that owns its own construction logic.
///
/// Closures can be registered directly with
/// [`Registration::producer`](crate::Registration::producer); implement this
/// trait when the producer needs markers or a teardown hook.
///
/// # Examples
///
/// ```rust
/// use object_factory::{BoxError, Container, Markers, Producer, Qualifier, Registration};
///
/// struct Pool { url: String }
///
/// struct PoolProducer;
///
/// impl Producer<Pool> for PoolProducer {
///     fn produce(&self, _container: &Container) -> Result<Pool, BoxError> {
///         Ok(Pool { url: "postgres://localhost".into() })
///     }
///
///     fn markers(&self) -> Markers {
///         Markers::new().qualifier(Qualifier::named("primary"))
///     }
/// }
///
/// let container = Container::new();
/// container.register(Registration::from_producer(PoolProducer)).unwrap();
///
/// let pool = container
///     .get_object_with::<Pool>(&Qualifier::named("primary").into())
///     .unwrap();
/// assert_eq!(pool.url, "postgres://localhost");
/// ```
pub trait Producer<T>: Send + Sync + 'static {
    /// Build a new value
    fn produce(&self, container: &Container) -> Result<T, BoxError>;

    /// Declared scope and qualifiers
    fn markers(&self) -> Markers {
        Markers::default()
    }

    /// Release a value built by this producer; called from `destroy()`
    fn destroy(&self, _object: &T) -> Result<(), BoxError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_markers() {
        let markers = Markers::new();
        assert_eq!(markers.resolved_scope(), Scope::Singleton);
        assert!(markers.resolved_qualifiers().is_empty());
    }

    #[test]
    fn test_markers_expand_stereotypes() {
        let stereotype = Stereotype::new("request_handler")
            .qualifier(Qualifier::named("web"))
            .scope(Scope::Prototype);

        let markers = Markers::new()
            .qualifier(Qualifier::named("users"))
            .stereotype(stereotype);

        assert_eq!(markers.resolved_scope(), Scope::Prototype);
        let quals = markers.resolved_qualifiers();
        assert!(quals.contains(&Qualifier::named("web")));
        assert!(quals.contains(&Qualifier::named("users")));
    }
}
