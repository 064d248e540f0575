//! Error types for the object factory

use crate::Qualifiers;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Boxed error returned by user code: constructors, producers, lifecycle hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Why a dependency could not be matched to exactly one provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyErrorKind {
    /// No provider matches the requested type and qualifiers
    Unsatisfied,
    /// More than one provider matches the requested type and qualifiers
    Ambiguous,
    /// The provider is already being constructed on this thread
    Circular,
}

impl fmt::Display for DependencyErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsatisfied => f.write_str("Unsatisfied"),
            Self::Ambiguous => f.write_str("Ambiguous"),
            Self::Circular => f.write_str("Circular"),
        }
    }
}

/// A dependency that could not be matched, with the member that required it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyError {
    /// What went wrong
    pub kind: DependencyErrorKind,
    /// Requested type
    pub type_name: &'static str,
    /// Requested qualifiers
    pub qualifiers: Qualifiers,
    /// Injection point that declared the dependency, if any
    pub member: Option<String>,
}

impl DependencyError {
    pub(crate) fn new(
        kind: DependencyErrorKind,
        type_name: &'static str,
        qualifiers: &Qualifiers,
    ) -> Self {
        Self {
            kind,
            type_name,
            qualifiers: qualifiers.clone(),
            member: None,
        }
    }

    pub(crate) fn with_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }
}

impl fmt::Display for DependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} dependency (type={}, qualifiers={}",
            self.kind, self.type_name, self.qualifiers
        )?;
        if let Some(member) = &self.member {
            write!(f, ", member={member}")?;
        }
        f.write_str(")")
    }
}

impl std::error::Error for DependencyError {}

/// Errors that can occur while configuring or using a [`Container`](crate::Container)
#[derive(Error, Debug, Clone)]
pub enum DiError {
    /// The dependency graph is not satisfiable; raised by `initialize()` and sticky
    #[error("Invalid definition: {0}")]
    Definition(DependencyError),

    /// A lookup made at call time could not be satisfied; local to that call
    #[error("Resolution failed: {0}")]
    Resolution(DependencyError),

    /// Construction, injection or a lifecycle hook failed
    #[error("Failed to invoke {member}: {source}")]
    Reflection {
        member: String,
        #[source]
        source: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// Operation not legal in the container's current state
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl DiError {
    /// Create an Unsatisfied resolution error
    #[inline]
    pub fn unsatisfied(type_name: &'static str, qualifiers: &Qualifiers) -> Self {
        Self::Resolution(DependencyError::new(
            DependencyErrorKind::Unsatisfied,
            type_name,
            qualifiers,
        ))
    }

    /// Create an Ambiguous resolution error
    #[inline]
    pub fn ambiguous(type_name: &'static str, qualifiers: &Qualifiers) -> Self {
        Self::Resolution(DependencyError::new(
            DependencyErrorKind::Ambiguous,
            type_name,
            qualifiers,
        ))
    }

    /// Create a Circular resolution error
    #[inline]
    pub fn circular(type_name: &'static str, qualifiers: &Qualifiers) -> Self {
        Self::Resolution(DependencyError::new(
            DependencyErrorKind::Circular,
            type_name,
            qualifiers,
        ))
    }

    /// Create a Reflection error from a message
    pub fn reflection(member: impl Into<String>, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::wrap(member, message.into())
    }

    /// Wrap an error raised by user code.
    ///
    /// A `DiError` coming back out of user code (for example a failed
    /// `get_object` inside a producer) is returned as is.
    pub fn wrap(member: impl Into<String>, error: BoxError) -> Self {
        match error.downcast::<DiError>() {
            Ok(inner) => *inner,
            Err(source) => Self::Reflection {
                member: member.into(),
                source: Arc::from(source),
            },
        }
    }

    /// The unmatched dependency, for Definition and Resolution errors
    pub fn dependency(&self) -> Option<&DependencyError> {
        match self {
            Self::Definition(dep) | Self::Resolution(dep) => Some(dep),
            _ => None,
        }
    }

    /// Whether this is an Unsatisfied dependency (definition or resolution time)
    pub fn is_unsatisfied(&self) -> bool {
        self.dependency()
            .is_some_and(|d| d.kind == DependencyErrorKind::Unsatisfied)
    }

    /// Whether this is an Ambiguous dependency (definition or resolution time)
    pub fn is_ambiguous(&self) -> bool {
        self.dependency()
            .is_some_and(|d| d.kind == DependencyErrorKind::Ambiguous)
    }

    /// Whether this is a Circular dependency
    pub fn is_circular(&self) -> bool {
        self.dependency()
            .is_some_and(|d| d.kind == DependencyErrorKind::Circular)
    }

    pub(crate) fn into_definition(self, member: String) -> Self {
        match self {
            Self::Resolution(dep) => Self::Definition(dep.with_member(member)),
            other => other,
        }
    }
}

/// Result type alias for object factory operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Qualifier;

    #[test]
    fn test_display_includes_member() {
        let err = DiError::unsatisfied("app::Db", &Qualifiers::from(Qualifier::named("primary")))
            .into_definition("app::Repo::new(arg 0)".into());

        let text = err.to_string();
        assert!(text.contains("Unsatisfied dependency"));
        assert!(text.contains("type=app::Db"));
        assert!(text.contains("@primary"));
        assert!(text.contains("member=app::Repo::new(arg 0)"));
        assert!(matches!(err, DiError::Definition(_)));
    }

    #[test]
    fn test_wrap_passes_di_error_through() {
        let inner = DiError::ambiguous("app::Db", &Qualifiers::new());
        let boxed: BoxError = Box::new(inner);

        let err = DiError::wrap("app::Repo::construct", boxed);
        assert!(err.is_ambiguous());
    }

    #[test]
    fn test_wrap_keeps_original_cause() {
        let boxed: BoxError = "socket closed".into();
        let err = DiError::wrap("app::Pool::construct", boxed);

        match &err {
            DiError::Reflection { member, source } => {
                assert_eq!(member, "app::Pool::construct");
                assert_eq!(source.to_string(), "socket closed");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(std::error::Error::source(&err).is_some());
    }
}
