//! Out-of-band values made available to conditions, converters and actions.
//!
//! Values are looked up by [`Key`]. Callers pass a context per parse, the
//! manager contributes its own store, and the two are merged with the
//! caller's context taking precedence.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::key::{AnyKey, Key};

/// A shared, type-erased injected value.
pub type InjectedValue = Arc<dyn Any + Send + Sync>;

type Provider = Arc<dyn Fn(&dyn InjectedValueAccess) -> Option<InjectedValue> + Send + Sync>;

/// Read access to injected values.
pub trait InjectedValueAccess: Send + Sync {
    /// Resolve the value stored under `key`.
    fn injected_value_any(&self, key: &AnyKey) -> Option<InjectedValue>;
}

/// Typed lookups on top of [`InjectedValueAccess`].
pub trait InjectedValueAccessExt: InjectedValueAccess {
    /// Resolve and downcast the value stored under `key`.
    fn injected_value<T: Any + Send + Sync>(&self, key: &Key<T>) -> Option<Arc<T>> {
        self.injected_value_any(key.erased())
            .and_then(|value| value.downcast::<T>().ok())
    }
}

impl<A: InjectedValueAccess + ?Sized> InjectedValueAccessExt for A {}

impl<A: InjectedValueAccess + ?Sized> InjectedValueAccess for Arc<A> {
    fn injected_value_any(&self, key: &AnyKey) -> Option<InjectedValue> {
        (**self).injected_value_any(key)
    }
}

/// Access that never has a value.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyValueAccess;

impl InjectedValueAccess for EmptyValueAccess {
    fn injected_value_any(&self, _key: &AnyKey) -> Option<InjectedValue> {
        None
    }
}

// ============================================================================
// Map-backed store
// ============================================================================

/// Mutable store of constant values and providers.
///
/// Providers receive the store itself, so a value may be derived from
/// other values in the same store.
#[derive(Clone, Default)]
pub struct MapBackedValueStore {
    providers: HashMap<AnyKey, Provider>,
}

impl MapBackedValueStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a constant value, replacing any previous value or provider.
    pub fn inject<T: Any + Send + Sync>(&mut self, key: Key<T>, value: T) {
        self.insert_shared(key.erased().clone(), Arc::new(value));
    }

    /// Store a provider computing the value on every lookup.
    pub fn inject_with<T, F>(&mut self, key: Key<T>, provider: F)
    where
        T: Any + Send + Sync,
        F: Fn(&dyn InjectedValueAccess) -> Option<T> + Send + Sync + 'static,
    {
        self.providers.insert(
            key.erased().clone(),
            Arc::new(move |context| {
                provider(context).map(|value| Arc::new(value) as InjectedValue)
            }),
        );
    }

    /// Builder form of [`inject`](Self::inject).
    pub fn with_value<T: Any + Send + Sync>(mut self, key: Key<T>, value: T) -> Self {
        self.inject(key, value);
        self
    }

    /// Remove the value or provider under `key`.
    pub fn remove<T>(&mut self, key: &Key<T>) -> bool {
        self.providers.remove(key.erased()).is_some()
    }

    /// Whether a value or provider is stored under `key`.
    pub fn contains(&self, key: &AnyKey) -> bool {
        self.providers.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    fn insert_shared(&mut self, key: AnyKey, value: InjectedValue) {
        self.providers
            .insert(key, Arc::new(move |_| Some(Arc::clone(&value))));
    }
}

impl InjectedValueAccess for MapBackedValueStore {
    fn injected_value_any(&self, key: &AnyKey) -> Option<InjectedValue> {
        self.providers.get(key).and_then(|provider| provider(self))
    }
}

impl fmt::Debug for MapBackedValueStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.providers.keys()).finish()
    }
}

// ============================================================================
// Merged access
// ============================================================================

/// Resolves from each delegate in order, returning the first hit.
#[derive(Clone)]
pub struct MergedValueAccess {
    delegates: Vec<Arc<dyn InjectedValueAccess>>,
}

impl MergedValueAccess {
    pub fn new(delegates: Vec<Arc<dyn InjectedValueAccess>>) -> Self {
        Self { delegates }
    }

    /// Merge two accesses, `first` taking precedence.
    pub fn of(first: Arc<dyn InjectedValueAccess>, second: Arc<dyn InjectedValueAccess>) -> Self {
        Self::new(vec![first, second])
    }
}

impl InjectedValueAccess for MergedValueAccess {
    fn injected_value_any(&self, key: &AnyKey) -> Option<InjectedValue> {
        self.delegates
            .iter()
            .find_map(|delegate| delegate.injected_value_any(key))
    }
}

// ============================================================================
// Memoizing access
// ============================================================================

/// Caches every lookup of the delegate, including misses.
///
/// Used for the lifetime of a single parse so providers run at most once
/// per key.
pub struct MemoizingValueAccess {
    delegate: Arc<dyn InjectedValueAccess>,
    memory: RwLock<HashMap<AnyKey, Option<InjectedValue>>>,
}

impl MemoizingValueAccess {
    pub fn new(delegate: Arc<dyn InjectedValueAccess>) -> Self {
        Self {
            delegate,
            memory: RwLock::new(HashMap::new()),
        }
    }

    /// Copy every value resolved so far into a constant store.
    pub fn snapshot_memory(&self) -> MapBackedValueStore {
        let mut store = MapBackedValueStore::new();
        for (key, value) in self.memory.read().iter() {
            if let Some(value) = value {
                store.insert_shared(key.clone(), Arc::clone(value));
            }
        }
        store
    }
}

impl InjectedValueAccess for MemoizingValueAccess {
    fn injected_value_any(&self, key: &AnyKey) -> Option<InjectedValue> {
        if let Some(cached) = self.memory.read().get(key) {
            return cached.clone();
        }
        // Resolve outside the lock; providers may look up other keys.
        let resolved = self.delegate.injected_value_any(key);
        self.memory
            .write()
            .entry(key.clone())
            .or_insert(resolved)
            .clone()
    }
}

impl fmt::Debug for MemoizingValueAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoizingValueAccess")
            .field("memorized", &self.memory.read().len())
            .finish_non_exhaustive()
    }
}
