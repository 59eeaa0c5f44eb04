//! Type-erased converter storage.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{ArgumentConverter, ConversionFailure};
use crate::inject::InjectedValueAccess;
use crate::key::{AnyKey, Key};

trait ErasedConverter: Send + Sync {
    fn check(&self, input: &str, context: &dyn InjectedValueAccess)
    -> Result<bool, ConversionFailure>;
    fn describe(&self) -> String;
    fn suggestions(&self, input: &str, context: &dyn InjectedValueAccess) -> Vec<String>;
    fn as_any(&self) -> &dyn Any;
}

struct Typed<T: 'static> {
    inner: Arc<dyn ArgumentConverter<T>>,
}

impl<T: 'static> ErasedConverter for Typed<T> {
    fn check(
        &self,
        input: &str,
        context: &dyn InjectedValueAccess,
    ) -> Result<bool, ConversionFailure> {
        self.inner
            .convert(input, context)
            .map(|converted| converted.is_exact())
    }

    fn describe(&self) -> String {
        self.inner.describe_acceptable_arguments()
    }

    fn suggestions(&self, input: &str, context: &dyn InjectedValueAccess) -> Vec<String> {
        self.inner.suggestions(input, context)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A converter registered under a key, usable without knowing its type.
///
/// The parser only needs to know whether a token converts (and how exactly);
/// typed values are produced later through [`ConverterHandle::typed`].
#[derive(Clone)]
pub struct ConverterHandle {
    key: AnyKey,
    inner: Arc<dyn ErasedConverter>,
}

impl ConverterHandle {
    pub fn new<T: 'static>(key: Key<T>, converter: Arc<dyn ArgumentConverter<T>>) -> Self {
        Self {
            key: key.into(),
            inner: Arc::new(Typed { inner: converter }),
        }
    }

    pub fn key(&self) -> &AnyKey {
        &self.key
    }

    /// Convert `input` and discard the values, reporting exactness.
    pub fn check(
        &self,
        input: &str,
        context: &dyn InjectedValueAccess,
    ) -> Result<bool, ConversionFailure> {
        self.inner.check(input, context)
    }

    pub fn describe_acceptable_arguments(&self) -> String {
        self.inner.describe()
    }

    pub fn suggestions(&self, input: &str, context: &dyn InjectedValueAccess) -> Vec<String> {
        self.inner.suggestions(input, context)
    }

    /// Recover the typed converter.
    pub fn typed<T: 'static>(&self) -> Option<Arc<dyn ArgumentConverter<T>>> {
        self.inner
            .as_any()
            .downcast_ref::<Typed<T>>()
            .map(|typed| Arc::clone(&typed.inner))
    }
}

impl fmt::Debug for ConverterHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterHandle")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// Lookup of converters by key.
pub trait ArgumentConverterAccess: Send + Sync {
    fn converter_handle(&self, key: &AnyKey) -> Option<ConverterHandle>;
}

/// Typed lookups on top of [`ArgumentConverterAccess`].
pub trait ArgumentConverterAccessExt: ArgumentConverterAccess {
    fn converter<T: 'static>(&self, key: &Key<T>) -> Option<Arc<dyn ArgumentConverter<T>>> {
        self.converter_handle(key.erased())
            .and_then(|handle| handle.typed::<T>())
    }
}

impl<A: ArgumentConverterAccess + ?Sized> ArgumentConverterAccessExt for A {}

impl<A: ArgumentConverterAccess + ?Sized> ArgumentConverterAccess for Arc<A> {
    fn converter_handle(&self, key: &AnyKey) -> Option<ConverterHandle> {
        (**self).converter_handle(key)
    }
}

/// Map of converters keyed by [`Key`].
#[derive(Clone, Default)]
pub struct ArgumentConverterStore {
    converters: HashMap<AnyKey, ConverterHandle>,
}

impl ArgumentConverterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `converter` under `key`, replacing any previous one.
    pub fn register<T, C>(&mut self, key: Key<T>, converter: C)
    where
        T: 'static,
        C: ArgumentConverter<T> + 'static,
    {
        self.register_shared(key, Arc::new(converter));
    }

    pub fn register_shared<T: 'static>(
        &mut self,
        key: Key<T>,
        converter: Arc<dyn ArgumentConverter<T>>,
    ) {
        let handle = ConverterHandle::new(key, converter);
        self.converters.insert(handle.key().clone(), handle);
    }

    pub fn contains(&self, key: &AnyKey) -> bool {
        self.converters.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &AnyKey> {
        self.converters.keys()
    }
}

impl ArgumentConverterAccess for ArgumentConverterStore {
    fn converter_handle(&self, key: &AnyKey) -> Option<ConverterHandle> {
        self.converters.get(key).cloned()
    }
}

impl fmt::Debug for ArgumentConverterStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.converters.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::converter::{FromStrConverter, StringConverter};
    use crate::inject::EmptyValueAccess;

    #[test]
    fn test_typed_lookup_round_trips() {
        let mut store = ArgumentConverterStore::new();
        store.register(Key::<i32>::of(), FromStrConverter::<i32>::new("any integer"));

        let converter = store.converter(&Key::<i32>::of()).expect("registered");
        let converted = converter.convert("12", &EmptyValueAccess).unwrap();
        assert_eq!(converted.values(), &[12]);
        assert!(store.converter(&Key::<i64>::of()).is_none());
    }

    #[test]
    fn test_handle_checks_without_type() {
        let mut store = ArgumentConverterStore::new();
        store.register(Key::<i32>::of(), FromStrConverter::<i32>::new("any integer"));
        store.register(Key::<String>::of(), StringConverter);

        let handle = store.converter_handle(Key::<i32>::of().erased()).unwrap();
        assert_eq!(handle.check("5", &EmptyValueAccess).ok(), Some(true));
        assert!(handle.check("five", &EmptyValueAccess).is_err());
        assert_eq!(handle.describe_acceptable_arguments(), "any integer");
        assert!(handle.typed::<String>().is_none());
    }

    #[test]
    fn test_register_replaces() {
        let mut store = ArgumentConverterStore::new();
        store.register(Key::<i32>::of(), FromStrConverter::<i32>::new("first"));
        store.register(Key::<i32>::of(), FromStrConverter::<i32>::new("second"));

        assert_eq!(store.len(), 1);
        let handle = store.converter_handle(Key::<i32>::of().erased()).unwrap();
        assert_eq!(handle.describe_acceptable_arguments(), "second");
    }
}
