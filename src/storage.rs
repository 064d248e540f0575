//! Registered providers and the lookups over them
//!
//! Providers are kept in registration order, which is also the order
//! plural selection reports them in. Unique lookups are memoized in a
//! `DashMap` once resolved.

use crate::definition::{Definition, TypeKey};
use crate::instance::ObjectInstance;
use crate::qualifier::QualifierMatcher;
use crate::{DiError, Qualifiers, Result};
use ahash::RandomState;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::any::TypeId;
use std::sync::Arc;

/// Thread-safe storage for object instances
pub(crate) struct ObjectRegistry {
    /// Every provider, in registration order
    instances: RwLock<Vec<Arc<ObjectInstance>>>,
    /// Memoized unique lookups
    lookups: DashMap<(TypeId, Qualifiers), Arc<ObjectInstance>, RandomState>,
}

impl ObjectRegistry {
    /// Create empty storage.
    ///
    /// Uses 8 shards: registries rarely hold more than a few dozen
    /// providers, and the default shard count is sized for far larger maps.
    #[inline]
    pub fn new() -> Self {
        Self {
            instances: RwLock::new(Vec::new()),
            lookups: DashMap::with_capacity_and_hasher_and_shard_amount(0, RandomState::new(), 8),
        }
    }

    /// Append a provider
    pub fn insert(&self, definition: Definition) {
        self.instances.write().push(Arc::new(ObjectInstance::new(definition)));
        self.lookups.clear();
    }

    /// Remove every provider matching `predicate`, returning how many were removed
    pub fn remove_where<F>(&self, predicate: F) -> usize
    where
        F: Fn(&Definition) -> bool,
    {
        let mut instances = self.instances.write();
        let before = instances.len();
        instances.retain(|i| !predicate(i.definition()));
        self.lookups.clear();
        before - instances.len()
    }

    /// Number of providers whose types include `key` and whose qualifiers equal `qualifiers`
    pub fn count_exact(&self, key: &TypeKey, qualifiers: &Qualifiers) -> usize {
        self.instances
            .read()
            .iter()
            .filter(|i| Self::is_exact(i, key, qualifiers))
            .count()
    }

    /// The single provider matching exactly, or Unsatisfied / Ambiguous.
    pub fn find_unique(&self, key: &TypeKey, qualifiers: &Qualifiers) -> Result<Arc<ObjectInstance>> {
        let memo_key = (key.id(), qualifiers.clone());
        if let Some(found) = self.lookups.get(&memo_key) {
            return Ok(Arc::clone(found.value()));
        }

        let found = {
            let instances = self.instances.read();
            let mut matches = instances.iter().filter(|i| Self::is_exact(i, key, qualifiers));
            match (matches.next(), matches.next()) {
                (None, _) => return Err(DiError::unsatisfied(key.name(), qualifiers)),
                (Some(_), Some(_)) => return Err(DiError::ambiguous(key.name(), qualifiers)),
                (Some(only), None) => Arc::clone(only),
            }
        };

        self.lookups.insert(memo_key, Arc::clone(&found));
        Ok(found)
    }

    /// Every provider whose types include `key` and whose qualifiers contain `qualifiers`
    pub fn find_all(&self, key: &TypeKey, qualifiers: &Qualifiers) -> Vec<Arc<ObjectInstance>> {
        self.instances
            .read()
            .iter()
            .filter(|i| {
                let definition = i.definition();
                definition.has_type(key)
                    && QualifierMatcher::matches_subset(definition.qualifiers(), qualifiers)
            })
            .cloned()
            .collect()
    }

    /// Snapshot of every provider, in registration order
    pub fn snapshot(&self) -> Vec<Arc<ObjectInstance>> {
        self.instances.read().clone()
    }

    /// Drop memoized lookups
    #[inline]
    pub fn clear_lookups(&self) {
        self.lookups.clear();
    }

    /// Number of providers
    #[inline]
    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    #[inline]
    fn is_exact(instance: &ObjectInstance, key: &TypeKey, qualifiers: &Qualifiers) -> bool {
        let definition = instance.definition();
        definition.has_type(key) && QualifierMatcher::matches_exact(definition.qualifiers(), qualifiers)
    }
}

impl Default for ObjectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectRegistry")
            .field("count", &self.len())
            .field("memoized", &self.lookups.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Qualifier, Registration};

    struct Db(&'static str);

    fn db(name: &'static str, qualifier: Option<&'static str>) -> Definition {
        let registration = Registration::producer(move |_| Ok(Db(name)));
        match qualifier {
            Some(q) => registration.qualifier(Qualifier::named(q)).into_definition(),
            None => registration.into_definition(),
        }
    }

    #[test]
    fn test_find_unique() {
        let registry = ObjectRegistry::new();
        registry.insert(db("main", None));
        registry.insert(db("replica", Some("replica")));

        let key = TypeKey::of::<Db>();
        assert!(registry.find_unique(&key, &Qualifiers::new()).is_ok());
        assert!(registry.find_unique(&key, &Qualifier::named("replica").into()).is_ok());

        let err = registry.find_unique(&key, &Qualifier::named("archive").into()).unwrap_err();
        assert!(err.is_unsatisfied());
    }

    #[test]
    fn test_find_unique_ambiguous() {
        let registry = ObjectRegistry::new();
        registry.insert(db("a", None));
        registry.insert(db("b", None));

        let err = registry.find_unique(&TypeKey::of::<Db>(), &Qualifiers::new()).unwrap_err();
        assert!(err.is_ambiguous());
        assert_eq!(registry.count_exact(&TypeKey::of::<Db>(), &Qualifiers::new()), 2);
    }

    #[test]
    fn test_find_all_is_subset_match_in_order() {
        let registry = ObjectRegistry::new();
        registry.insert(db("main", None));
        registry.insert(db("replica", Some("replica")));
        registry.insert(db("archive", Some("archive")));

        let all = registry.find_all(&TypeKey::of::<Db>(), &Qualifiers::new());
        assert_eq!(all.len(), 3);

        let replicas = registry.find_all(&TypeKey::of::<Db>(), &Qualifier::named("replica").into());
        assert_eq!(replicas.len(), 1);

        assert_eq!(registry.find_all(&TypeKey::any(), &Qualifiers::new()).len(), 3);
        assert!(registry.find_all(&TypeKey::of::<String>(), &Qualifiers::new()).is_empty());
    }

    #[test]
    fn test_remove_where_invalidates_memo() {
        let registry = ObjectRegistry::new();
        registry.insert(db("main", None));
        let key = TypeKey::of::<Db>();
        registry.find_unique(&key, &Qualifiers::new()).unwrap();

        let removed = registry.remove_where(|d| d.has_type(&key));
        assert_eq!(removed, 1);
        assert!(registry.find_unique(&key, &Qualifiers::new()).unwrap_err().is_unsatisfied());
    }
}
