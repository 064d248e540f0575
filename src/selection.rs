//! Lazy handles over matching providers

use crate::definition::TypeKey;
use crate::instance::ObjectInstance;
use crate::{Container, DiError, Qualifiers, Result};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A lazy view over every provider of `T` carrying at least the requested
/// qualifiers.
///
/// Nothing is materialized when the selection is created; values are
/// resolved one by one while iterating, or by [`get`](Selection::get).
///
/// # Examples
///
/// ```rust
/// use object_factory::{Container, Qualifier, Registration};
///
/// struct Plugin(&'static str);
///
/// let container = Container::new();
/// container.register(Registration::producer(|_| Ok(Plugin("auth")))).unwrap();
/// container
///     .register(Registration::producer(|_| Ok(Plugin("cache"))).qualifier(Qualifier::named("fast")))
///     .unwrap();
///
/// let plugins = container.select::<Plugin>(&Default::default()).unwrap();
/// assert_eq!(plugins.len(), 2);
///
/// let names: Vec<_> = plugins.iter().map(|p| p.unwrap().0).collect();
/// assert_eq!(names, vec!["auth", "cache"]);
/// ```
pub struct Selection<T: ?Sized> {
    container: Container,
    key: TypeKey,
    qualifiers: Qualifiers,
    matches: Vec<Arc<ObjectInstance>>,
    _marker: PhantomData<fn() -> Arc<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Selection<T> {
    pub(crate) fn new(
        container: Container,
        qualifiers: Qualifiers,
        matches: Vec<Arc<ObjectInstance>>,
    ) -> Self {
        Self {
            container,
            key: TypeKey::of::<T>(),
            qualifiers,
            matches,
            _marker: PhantomData,
        }
    }

    /// Number of matching providers
    #[inline]
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether nothing matched
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Whether no provider matched
    #[inline]
    pub fn is_unsatisfied(&self) -> bool {
        self.matches.is_empty()
    }

    /// Whether more than one provider matched
    #[inline]
    pub fn is_ambiguous(&self) -> bool {
        self.matches.len() > 1
    }

    /// Requested qualifiers
    pub fn qualifiers(&self) -> &Qualifiers {
        &self.qualifiers
    }

    /// Resolve the single match.
    pub fn get(&self) -> Result<Arc<T>> {
        match self.matches.as_slice() {
            [only] => self.container.resolve_instance::<T>(only, &self.key),
            [] => Err(DiError::unsatisfied(self.key.name(), &self.qualifiers)),
            _ => Err(DiError::ambiguous(self.key.name(), &self.qualifiers)),
        }
    }

    /// Resolve every match in registration order, one per step.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            selection: self,
            position: 0,
        }
    }
}

impl<T: ?Sized> Clone for Selection<T> {
    fn clone(&self) -> Self {
        Self {
            container: self.container.clone(),
            key: self.key,
            qualifiers: self.qualifiers.clone(),
            matches: self.matches.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: ?Sized> fmt::Debug for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("type", &self.key)
            .field("qualifiers", &self.qualifiers)
            .field("matches", &self.matches.len())
            .finish()
    }
}

/// Iterator over a [`Selection`]
pub struct Iter<'a, T: ?Sized> {
    selection: &'a Selection<T>,
    position: usize,
}

impl<T: ?Sized + Send + Sync + 'static> Iterator for Iter<'_, T> {
    type Item = Result<Arc<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        let instance = self.selection.matches.get(self.position)?;
        self.position += 1;
        Some(
            self.selection
                .container
                .resolve_instance::<T>(instance, &self.selection.key),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.selection.matches.len() - self.position;
        (remaining, Some(remaining))
    }
}

impl<T: ?Sized + Send + Sync + 'static> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T: ?Sized + Send + Sync + 'static> IntoIterator for &'a Selection<T> {
    type Item = Result<Arc<T>>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Container, Qualifier, Qualifiers, Registration};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct Handler(u8);

    #[test]
    fn test_selection_is_lazy() {
        let calls = Arc::new(AtomicUsize::new(0));
        let container = Container::new();
        for id in 0..3u8 {
            let calls = Arc::clone(&calls);
            container
                .register(Registration::producer(move |_| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Handler(id))
                }))
                .unwrap();
        }

        let handlers = container.select::<Handler>(&Qualifiers::new()).unwrap();
        assert_eq!(handlers.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let mut iter = handlers.iter();
        assert_eq!(iter.next().unwrap().unwrap().0, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(iter.len(), 2);
    }

    #[test]
    fn test_selection_get() {
        let container = Container::new();
        container.register(Registration::producer(|_| Ok(Handler(1)))).unwrap();
        container
            .register(Registration::producer(|_| Ok(Handler(2))).qualifier(Qualifier::named("admin")))
            .unwrap();

        let all = container.select::<Handler>(&Qualifiers::new()).unwrap();
        assert!(all.is_ambiguous());
        assert!(all.get().unwrap_err().is_ambiguous());

        let admin = container.select::<Handler>(&Qualifier::named("admin").into()).unwrap();
        assert_eq!(admin.get().unwrap().0, 2);

        let none = container.select::<Handler>(&Qualifier::named("guest").into()).unwrap();
        assert!(none.is_unsatisfied());
        assert!(none.get().unwrap_err().is_unsatisfied());
    }
}
