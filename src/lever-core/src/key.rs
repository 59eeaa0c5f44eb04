//! Typed lookup keys for converters and injected values.
//!
//! A [`Key<T>`] pairs the runtime identity of `T` with an optional
//! [`Qualifier`], so two converters for the same type can coexist when one
//! of them is tagged (for example a "world name" `String` next to the plain
//! `String` converter).

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::sync::Arc;

/// Marker for types usable as key qualifiers.
///
/// Only types implementing this trait can tag a [`Key`], so an unsuitable
/// qualifier is rejected when the key is built rather than when it is used.
pub trait InjectQualifier: Any + fmt::Debug + Send + Sync {}

trait DynQualifier: fmt::Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn dyn_eq(&self, other: &dyn DynQualifier) -> bool;
    fn dyn_hash(&self, state: &mut dyn Hasher);
}

impl<Q> DynQualifier for Q
where
    Q: InjectQualifier + Eq + Hash,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn dyn_eq(&self, other: &dyn DynQualifier) -> bool {
        other
            .as_any()
            .downcast_ref::<Q>()
            .is_some_and(|other| other == self)
    }

    fn dyn_hash(&self, mut state: &mut dyn Hasher) {
        self.hash(&mut state);
    }
}

/// Tag distinguishing keys of the same type.
///
/// A qualifier is either a bare marker type ([`Qualifier::tag`]) or a marker
/// value with its own equality ([`Qualifier::of`]).
#[derive(Clone)]
pub struct Qualifier {
    type_id: TypeId,
    type_name: &'static str,
    value: Option<Arc<dyn DynQualifier>>,
}

impl Qualifier {
    /// Qualifier identified by the marker type alone.
    pub fn tag<Q: InjectQualifier>() -> Self {
        Self {
            type_id: TypeId::of::<Q>(),
            type_name: std::any::type_name::<Q>(),
            value: None,
        }
    }

    /// Qualifier identified by the marker type and the value's equality.
    pub fn of<Q>(value: Q) -> Self
    where
        Q: InjectQualifier + Eq + Hash,
    {
        Self {
            type_id: TypeId::of::<Q>(),
            type_name: std::any::type_name::<Q>(),
            value: Some(Arc::new(value)),
        }
    }

    /// Name of the marker type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl PartialEq for Qualifier {
    fn eq(&self, other: &Self) -> bool {
        if self.type_id != other.type_id {
            return false;
        }
        match (&self.value, &other.value) {
            (None, None) => true,
            (Some(a), Some(b)) => a.dyn_eq(b.as_ref()),
            _ => false,
        }
    }
}

impl Eq for Qualifier {}

impl Hash for Qualifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        if let Some(value) = &self.value {
            value.dyn_hash(state);
        }
    }
}

impl fmt::Debug for Qualifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{value:?}"),
            None => f.write_str(short_type_name(self.type_name)),
        }
    }
}

/// Type-erased form of [`Key<T>`], used as the map key in stores.
#[derive(Clone)]
pub struct AnyKey {
    type_id: TypeId,
    type_name: &'static str,
    qualifier: Option<Qualifier>,
}

impl AnyKey {
    /// Name of the keyed type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The qualifier, if any.
    pub fn qualifier(&self) -> Option<&Qualifier> {
        self.qualifier.as_ref()
    }

    /// Whether this key identifies values of type `T`.
    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

impl PartialEq for AnyKey {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id && self.qualifier == other.qualifier
    }
}

impl Eq for AnyKey {}

impl Hash for AnyKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
        self.qualifier.hash(state);
    }
}

impl fmt::Debug for AnyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for AnyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.qualifier {
            Some(qualifier) => write!(f, "@{qualifier:?} {}", short_type_name(self.type_name)),
            None => f.write_str(short_type_name(self.type_name)),
        }
    }
}

/// Typed lookup key.
pub struct Key<T> {
    inner: AnyKey,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> Key<T> {
    /// Unqualified key for `T`.
    pub fn of() -> Self {
        Self {
            inner: AnyKey {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                qualifier: None,
            },
            _marker: PhantomData,
        }
    }

    /// Key for `T` tagged with `qualifier`.
    pub fn qualified(qualifier: Qualifier) -> Self {
        let mut key = Self::of();
        key.inner.qualifier = Some(qualifier);
        key
    }
}

impl<T> Key<T> {
    /// The type-erased key.
    pub fn erased(&self) -> &AnyKey {
        &self.inner
    }

    /// The qualifier, if any.
    pub fn qualifier(&self) -> Option<&Qualifier> {
        self.inner.qualifier.as_ref()
    }
}

impl<T> Clone for Key<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> PartialEq for Key<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Eq for Key<T> {}

impl<T> Hash for Key<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl<T> fmt::Debug for Key<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key<{}>", self.inner)
    }
}

impl<T> From<Key<T>> for AnyKey {
    fn from(key: Key<T>) -> Self {
        key.inner
    }
}

/// Strips module paths from a type name (`alloc::string::String` -> `String`).
fn short_type_name(name: &'static str) -> &'static str {
    let generic_start = name.find('<').unwrap_or(name.len());
    match name[..generic_start].rfind("::") {
        Some(idx) => &name[idx + 2..],
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Debug, PartialEq, Eq, Hash)]
    struct WorldName;
    impl InjectQualifier for WorldName {}

    #[derive(Debug, PartialEq, Eq, Hash)]
    struct Named(&'static str);
    impl InjectQualifier for Named {}

    #[test]
    fn test_keys_of_same_type_are_equal() {
        assert_eq!(Key::<String>::of(), Key::<String>::of());
        assert_ne!(Key::<String>::of().erased(), Key::<i32>::of().erased());
    }

    #[test]
    fn test_qualifier_distinguishes_keys() {
        let plain = Key::<String>::of();
        let tagged = Key::<String>::qualified(Qualifier::tag::<WorldName>());
        assert_ne!(plain, tagged);
        assert_eq!(
            tagged,
            Key::<String>::qualified(Qualifier::tag::<WorldName>())
        );
    }

    #[test]
    fn test_valued_qualifiers_compare_by_value() {
        let a = Key::<i64>::qualified(Qualifier::of(Named("a")));
        let also_a = Key::<i64>::qualified(Qualifier::of(Named("a")));
        let b = Key::<i64>::qualified(Qualifier::of(Named("b")));

        assert_eq!(a, also_a);
        assert_ne!(a, b);

        let set: HashSet<AnyKey> = [a, also_a, b].into_iter().map(AnyKey::from).collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_display_uses_short_names() {
        assert_eq!(Key::<String>::of().erased().to_string(), "String");
        let tagged = Key::<String>::qualified(Qualifier::tag::<WorldName>());
        assert_eq!(tagged.erased().to_string(), "@WorldName String");
    }
}
