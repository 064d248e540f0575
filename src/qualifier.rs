//! Qualifiers and the matching rules built on them
//!
//! A [`Qualifier`] distinguishes several providers of the same type. Unique
//! resolution compares qualifier sets exactly, plural selection accepts any
//! provider carrying at least the requested qualifiers.

use crate::Scope;
use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Symbolic discriminator between providers of an identical type.
///
/// Equality is structural: two qualifiers are equal when both the name and
/// every attribute are equal.
///
/// # Examples
///
/// ```rust
/// use object_factory::Qualifier;
///
/// let a = Qualifier::named("datasource").with("name", "primary");
/// let b = Qualifier::named("datasource").with("name", "primary");
/// let c = Qualifier::named("datasource").with("name", "replica");
///
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Qualifier {
    name: Cow<'static, str>,
    attributes: BTreeMap<Cow<'static, str>, Cow<'static, str>>,
}

impl Qualifier {
    /// Create a qualifier without attributes
    #[inline]
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Add (or replace) an attribute
    #[inline]
    pub fn with(
        mut self,
        key: impl Into<Cow<'static, str>>,
        value: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Qualifier name
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Look up an attribute value
    #[inline]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(|v| v.as_ref())
    }
}

impl fmt::Display for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.name)?;
        if !self.attributes.is_empty() {
            f.write_str("(")?;
            for (i, (k, v)) in self.attributes.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{k}={v}")?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// An ordered set of qualifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Qualifiers(BTreeSet<Qualifier>);

impl Qualifiers {
    /// Empty qualifier set (the "default" provider)
    #[inline]
    pub fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Add a qualifier and continue the chain
    #[inline]
    pub fn with(mut self, qualifier: Qualifier) -> Self {
        self.0.insert(qualifier);
        self
    }

    /// Insert a qualifier, returning `false` if it was already present
    #[inline]
    pub fn insert(&mut self, qualifier: Qualifier) -> bool {
        self.0.insert(qualifier)
    }

    /// Whether the set contains `qualifier`
    #[inline]
    pub fn contains(&self, qualifier: &Qualifier) -> bool {
        self.0.contains(qualifier)
    }

    /// Whether every qualifier of `self` is also in `other`
    #[inline]
    pub fn is_subset(&self, other: &Qualifiers) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Number of qualifiers
    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the set is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Qualifier> {
        self.0.iter()
    }
}

impl From<Qualifier> for Qualifiers {
    fn from(qualifier: Qualifier) -> Self {
        Self::new().with(qualifier)
    }
}

impl FromIterator<Qualifier> for Qualifiers {
    fn from_iter<I: IntoIterator<Item = Qualifier>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<Qualifier> for Qualifiers {
    fn extend<I: IntoIterator<Item = Qualifier>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<'a> IntoIterator for &'a Qualifiers {
    type Item = &'a Qualifier;
    type IntoIter = std::collections::btree_set::Iter<'a, Qualifier>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, q) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{q}")?;
        }
        f.write_str("]")
    }
}

/// A named bundle of qualifiers and an optional default scope.
///
/// Attaching a stereotype to a provider's markers is shorthand for attaching
/// each of its qualifiers (and its scope, unless one is declared directly).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stereotype {
    name: Cow<'static, str>,
    qualifiers: Qualifiers,
    scope: Option<Scope>,
}

impl Stereotype {
    /// Create an empty stereotype
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            qualifiers: Qualifiers::new(),
            scope: None,
        }
    }

    /// Add a qualifier carried by this stereotype
    pub fn qualifier(mut self, qualifier: Qualifier) -> Self {
        self.qualifiers.insert(qualifier);
        self
    }

    /// Set the default scope carried by this stereotype
    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = Some(scope);
        self
    }

    /// Stereotype name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Pure comparison functions over qualifier sets.
pub struct QualifierMatcher;

impl QualifierMatcher {
    /// Unique-resolution rule: the sets must be equal.
    #[inline]
    pub fn matches_exact(candidate: &Qualifiers, query: &Qualifiers) -> bool {
        candidate == query
    }

    /// Plural-selection rule: every queried qualifier must be carried by the
    /// candidate. An empty query matches every candidate.
    #[inline]
    pub fn matches_subset(candidate: &Qualifiers, query: &Qualifiers) -> bool {
        query.is_subset(candidate)
    }

    /// Expand stereotypes into the qualifier set and scope they stand for.
    ///
    /// The declared scope wins over stereotype scopes; among stereotypes the
    /// first one declaring a scope wins. `None` means nothing declared one.
    pub fn expand(
        qualifiers: &Qualifiers,
        scope: Option<Scope>,
        stereotypes: &[Stereotype],
    ) -> (Qualifiers, Option<Scope>) {
        let mut expanded = qualifiers.clone();
        for stereotype in stereotypes {
            expanded.extend(stereotype.qualifiers.iter().cloned());
        }
        let scope = scope.or_else(|| stereotypes.iter().find_map(|s| s.scope));
        (expanded, scope)
    }
}
