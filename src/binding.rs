use alloc::vec::Vec;

use crate::key::Key;

/// Handle of a binding stored in a [`crate::Binder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BindingId(pub(crate) u64);

/// How many values a binding holds.
/// ## Variants
/// - `One`: the newest value replaces the previous one
/// - `Many`: values accumulate in insertion order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Constraint {
    One,
    #[default]
    Many,
}

/// Whether a binding can be silently replaced by a later binding for the same key and name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strength {
    #[default]
    Strict,
    Weak,
}

/// Registry entry mapping one or more keys (plus an optional name) to one or more values.
///
/// `M` is an extension payload for specialized binders, see [`crate::InjectionMeta`].
#[derive(Debug, Clone)]
pub struct Binding<V, M = ()> {
    pub(crate) keys: Vec<Key>,
    pub(crate) name: Option<Key>,
    pub(crate) values: Vec<V>,
    pub(crate) constraint: Constraint,
    pub(crate) strength: Strength,
    pub(crate) meta: M,
}

impl<V, M: Default> Binding<V, M> {
    #[inline]
    #[must_use]
    pub fn new(key: Key) -> Self {
        Self::with_meta(key, M::default())
    }
}

impl<V, M> Binding<V, M> {
    #[inline]
    #[must_use]
    pub fn with_meta(key: Key, meta: M) -> Self {
        Self {
            keys: alloc::vec![key],
            name: None,
            values: Vec::new(),
            constraint: Constraint::Many,
            strength: Strength::Strict,
            meta,
        }
    }

    #[inline]
    #[must_use]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    /// The key the binding was created with
    #[inline]
    #[must_use]
    pub fn key(&self) -> &Key {
        &self.keys[0]
    }

    #[inline]
    #[must_use]
    pub const fn name(&self) -> Option<&Key> {
        self.name.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn values(&self) -> &[V] {
        &self.values
    }

    /// The most recently assigned value
    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<&V> {
        self.values.last()
    }

    #[inline]
    #[must_use]
    pub const fn constraint(&self) -> Constraint {
        self.constraint
    }

    #[inline]
    #[must_use]
    pub const fn strength(&self) -> Strength {
        self.strength
    }

    #[inline]
    #[must_use]
    pub fn is_weak(&self) -> bool {
        self.strength == Strength::Weak
    }

    #[inline]
    #[must_use]
    pub const fn meta(&self) -> &M {
        &self.meta
    }

    pub(crate) fn add_key(&mut self, key: Key) {
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    pub(crate) fn push_value(&mut self, value: V) {
        if self.constraint == Constraint::One {
            self.values.clear();
        }
        self.values.push(value);
    }

    pub(crate) fn set_constraint(&mut self, constraint: Constraint) {
        self.constraint = constraint;
        if constraint == Constraint::One && self.values.len() > 1 {
            let last = self.values.len() - 1;
            self.values.drain(..last);
        }
    }

    pub(crate) fn remove_values(&mut self, values: &[V])
    where
        V: PartialEq,
    {
        self.values.retain(|value| !values.contains(value));
    }
}

#[cfg(test)]
mod tests {
    use super::{Binding, Constraint, Strength};
    use crate::key::Key;

    #[test]
    fn test_one_constraint_replaces_value() {
        let mut binding = Binding::<i32>::new(Key::from("key"));
        binding.set_constraint(Constraint::One);
        binding.push_value(1);
        binding.push_value(2);

        assert_eq!(binding.values(), &[2]);
        assert_eq!(binding.value(), Some(&2));
    }

    #[test]
    fn test_many_constraint_accumulates() {
        let mut binding = Binding::<i32>::new(Key::from("key"));
        binding.push_value(1);
        binding.push_value(2);
        binding.push_value(3);

        assert_eq!(binding.values(), &[1, 2, 3]);

        binding.remove_values(&[1, 3]);
        assert_eq!(binding.values(), &[2]);

        binding.remove_values(&[2]);
        assert!(binding.values().is_empty());
        assert_eq!(binding.value(), None);
    }

    #[test]
    fn test_keys_dedup() {
        let mut binding = Binding::<i32>::new(Key::from("first"));
        binding.add_key(Key::from("second"));
        binding.add_key(Key::from("first"));

        assert_eq!(binding.keys(), &[Key::from("first"), Key::from("second")]);
        assert_eq!(binding.key(), &Key::from("first"));
        assert_eq!(binding.strength(), Strength::Strict);
    }
}
