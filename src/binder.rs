use alloc::{collections::BTreeMap, vec::Vec};
use tracing::{debug, error};

use crate::{
    binding::{Binding, BindingId, Constraint, Strength},
    errors::BinderErrorKind,
    key::Key,
    runtime::{self, RuntimeBinding, RuntimeOption, RuntimeValue},
};

/// Multi-map from `(key, name)` to bindings.
///
/// Bindings live in an arena addressed by [`BindingId`], and every `(key, name)` slot points into it,
/// so a polymorphic binding registered under several keys is stored once.
///
/// # Conflicts
/// Storing a binding into an occupied `(key, name)` slot:
/// - replaces the existing binding if it's weak or has no values;
/// - keeps the existing binding and skips the slot if the new binding is weak;
/// - fails with [`BinderErrorKind::Conflict`] otherwise.
///
/// All slots are checked before anything is changed, so a failed bind leaves the binder untouched.
#[derive(Debug, Clone)]
pub struct Binder<V, M = ()> {
    bindings: BTreeMap<BindingId, Binding<V, M>>,
    index: BTreeMap<Key, BTreeMap<Option<Key>, BindingId>>,
    next_id: u64,
    whitelist: Option<Vec<RuntimeValue>>,
}

impl<V, M> Default for Binder<V, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, M> Binder<V, M> {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bindings: BTreeMap::new(),
            index: BTreeMap::new(),
            next_id: 0,
            whitelist: None,
        }
    }

    /// Starts a binding for the key. Nothing is stored until [`BindingBuilder::finish`] is called.
    #[inline]
    #[must_use]
    pub fn bind(&mut self, key: impl Into<Key>) -> BindingBuilder<'_, V, M>
    where
        M: Default,
    {
        BindingBuilder {
            binding: Binding::new(key.into()),
            binder: self,
        }
    }

    /// Stores a complete binding, resolving conflicts for each of its keys.
    ///
    /// If the binding loses every slot to strict bindings (it's weak), it isn't stored
    /// and [`Self::binding`] returns `None` for the returned id.
    ///
    /// # Errors
    /// Returns [`BinderErrorKind::Conflict`] if one of the slots is taken by a strict binding with values
    /// and the new binding isn't weak.
    #[inline]
    pub fn insert(&mut self, binding: Binding<V, M>) -> Result<BindingId, BinderErrorKind> {
        self.insert_yielding(binding, |_| false).map(|(id, _)| id)
    }

    /// Same as [`Self::insert`], but a binding for which `yields` returns `true` holds its slots like a weak one,
    /// whether it's the existing or the new one.
    /// Returns the id of the new binding and the replaced bindings that lost their last slot.
    pub(crate) fn insert_yielding(
        &mut self,
        mut binding: Binding<V, M>,
        yields: impl Fn(&Binding<V, M>) -> bool,
    ) -> Result<(BindingId, Vec<(BindingId, Binding<V, M>)>), BinderErrorKind> {
        let mut kept_keys = Vec::with_capacity(binding.keys.len());
        let mut replaced = Vec::new();

        for key in &binding.keys {
            let Some(existing_id) = self.slot(key, binding.name.as_ref()) else {
                kept_keys.push(key.clone());
                continue;
            };
            let Some(existing) = self.bindings.get(&existing_id) else {
                kept_keys.push(key.clone());
                continue;
            };

            if existing.is_weak() || existing.values.is_empty() || yields(existing) {
                replaced.push((key.clone(), existing_id));
                kept_keys.push(key.clone());
            } else if binding.is_weak() || yields(&binding) {
                debug!(%key, "Weak binding yields to the existing strict binding");
            } else {
                return Err(BinderErrorKind::Conflict {
                    key: key.clone(),
                    name: binding.name.clone(),
                });
            }
        }

        let id = BindingId(self.next_id);
        self.next_id += 1;

        if kept_keys.is_empty() {
            return Ok((id, Vec::new()));
        }

        let mut dropped = Vec::new();
        for (key, existing_id) in replaced {
            debug!(%key, "Existing binding replaced");
            if let Some(existing) = self.detach(&key, binding.name.as_ref(), existing_id) {
                dropped.push((existing_id, existing));
            }
        }
        for key in &kept_keys {
            self.index.entry(key.clone()).or_default().insert(binding.name.clone(), id);
        }
        binding.keys = kept_keys;
        self.bindings.insert(id, binding);

        Ok((id, dropped))
    }

    fn slot(&self, key: &Key, name: Option<&Key>) -> Option<BindingId> {
        self.index.get(key).and_then(|names| names.get(&name.cloned())).copied()
    }

    /// Removes one `(key, name)` slot of the binding, dropping the binding once no slot points to it.
    /// Returns the dropped binding.
    fn detach(&mut self, key: &Key, name: Option<&Key>, id: BindingId) -> Option<Binding<V, M>> {
        if let Some(names) = self.index.get_mut(key) {
            names.remove(&name.cloned());
            if names.is_empty() {
                self.index.remove(key);
            }
        }
        if let Some(binding) = self.bindings.get_mut(&id) {
            binding.keys.retain(|binding_key| binding_key != key);
            if binding.keys.is_empty() {
                return self.bindings.remove(&id);
            }
        }
        None
    }

    #[inline]
    #[must_use]
    pub fn get_binding(&self, key: &Key, name: Option<&Key>) -> Option<&Binding<V, M>> {
        self.slot(key, name).and_then(|id| self.bindings.get(&id))
    }

    #[inline]
    #[must_use]
    pub fn get_binding_id(&self, key: &Key, name: Option<&Key>) -> Option<BindingId> {
        self.slot(key, name)
    }

    #[inline]
    #[must_use]
    pub fn binding(&self, id: BindingId) -> Option<&Binding<V, M>> {
        self.bindings.get(&id)
    }

    #[inline]
    pub(crate) fn binding_mut(&mut self, id: BindingId) -> Option<&mut Binding<V, M>> {
        self.bindings.get_mut(&id)
    }

    /// Removes the `(key, name)` slot. Bindings under the same key with other names are kept.
    /// Returns the id of the binding that occupied the slot.
    pub fn unbind(&mut self, key: &Key, name: Option<&Key>) -> Option<BindingId> {
        let id = self.slot(key, name)?;
        let _ = self.detach(key, name, id);
        Some(id)
    }

    /// Removes the binding under all of its keys
    pub fn unbind_binding(&mut self, id: BindingId) -> Option<Binding<V, M>> {
        let binding = self.bindings.remove(&id)?;
        for key in &binding.keys {
            if let Some(names) = self.index.get_mut(key) {
                if names.get(&binding.name) == Some(&id) {
                    names.remove(&binding.name);
                }
                if names.is_empty() {
                    self.index.remove(key);
                }
            }
        }
        Some(binding)
    }

    /// Removes the values from the binding, keeping the binding itself even if no values remain.
    /// Returns `false` if there is no such binding.
    pub fn remove_value(&mut self, id: BindingId, values: &[V]) -> bool
    where
        V: PartialEq,
    {
        match self.bindings.get_mut(&id) {
            Some(binding) => {
                binding.remove_values(values);
                true
            }
            None => false,
        }
    }

    /// Removes one key of a polymorphic binding. The binding is dropped with its last key.
    /// Returns `false` if the binding isn't stored under the key.
    pub fn remove_key(&mut self, id: BindingId, key: &Key) -> bool {
        let Some(name) = self.bindings.get(&id).map(|binding| binding.name.clone()) else {
            return false;
        };
        if self.slot(key, name.as_ref()) != Some(id) {
            return false;
        }
        let _ = self.detach(key, name.as_ref(), id);
        true
    }

    pub fn iter(&self) -> impl Iterator<Item = (BindingId, &Binding<V, M>)> {
        self.bindings.iter().map(|(id, binding)| (*id, binding))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Restricts `To` values accepted by [`Self::consume_bindings`]
    #[inline]
    pub fn whitelist_bindings(&mut self, whitelist: Vec<RuntimeValue>) {
        self.whitelist = Some(whitelist);
    }

    #[inline]
    #[must_use]
    pub fn whitelist(&self) -> Option<&[RuntimeValue]> {
        self.whitelist.as_deref()
    }

    /// Applies runtime bindings, see [`crate::runtime`].
    /// The records are applied all or nothing: if one of them fails, the binder is left as it was.
    /// Only the `Weak` option has a meaning for a plain binder, the others are ignored.
    ///
    /// # Errors
    /// - Returns parse errors of [`runtime::parse`]
    /// - Returns [`BinderErrorKind::RuntimeFailedWhitelistCheck`] if a whitelist is set and a `To` value is missing from it
    /// - Returns [`BinderErrorKind::RuntimeTooManyKeys`] if a record has more than one `Bind` key
    /// - Returns [`BinderErrorKind::Conflict`] if a record conflicts with an existing binding or an earlier record
    pub fn consume_bindings(&mut self, json: &str) -> Result<Vec<BindingId>, BinderErrorKind>
    where
        V: From<RuntimeValue> + Clone,
        M: Default + Clone,
    {
        let records = runtime::parse(json).inspect_err(|err| error!("{}", err))?;
        self.validate_records(&records).inspect_err(|err| error!("{}", err))?;

        let mut staged = self.clone();
        let ids = staged.apply_records(records).inspect_err(|err| error!("{}", err))?;
        *self = staged;
        Ok(ids)
    }

    fn apply_records(&mut self, records: Vec<RuntimeBinding>) -> Result<Vec<BindingId>, BinderErrorKind>
    where
        V: From<RuntimeValue>,
        M: Default,
    {
        let mut ids = Vec::with_capacity(records.len());
        for RuntimeBinding {
            bind,
            to,
            to_name,
            options,
        } in records
        {
            let key = bind.into_iter().next().ok_or(BinderErrorKind::RuntimeNoBind)?;
            let mut binding = Binding::new(Key::from(key));
            for value in to {
                binding.push_value(value.into());
            }
            binding.name = to_name.map(Key::from);
            if options.contains(&RuntimeOption::Weak) {
                binding.strength = Strength::Weak;
            }
            ids.push(self.insert(binding)?);
        }
        Ok(ids)
    }

    fn validate_records(&self, records: &[RuntimeBinding]) -> Result<(), BinderErrorKind> {
        if let Some(whitelist) = &self.whitelist {
            runtime::check_whitelist(records, whitelist)?;
        }
        for record in records {
            if record.bind.len() > 1 {
                return Err(BinderErrorKind::RuntimeTooManyKeys { count: record.bind.len() });
            }
        }
        Ok(())
    }
}

/// Chained builder returned by [`Binder::bind`]
pub struct BindingBuilder<'a, V, M = ()> {
    binder: &'a mut Binder<V, M>,
    binding: Binding<V, M>,
}

impl<'a, V, M> BindingBuilder<'a, V, M> {
    /// Adds another key to the same binding
    #[inline]
    #[must_use]
    pub fn bind(mut self, key: impl Into<Key>) -> Self {
        self.binding.add_key(key.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn to(mut self, value: impl Into<V>) -> Self {
        self.binding.push_value(value.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn to_name(mut self, name: impl Into<Key>) -> Self {
        self.binding.name = Some(name.into());
        self
    }

    #[inline]
    #[must_use]
    pub fn weak(mut self) -> Self {
        self.binding.strength = Strength::Weak;
        self
    }

    #[inline]
    #[must_use]
    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.binding.set_constraint(constraint);
        self
    }

    /// Stores the binding, see [`Binder::insert`]
    ///
    /// # Errors
    /// Returns [`BinderErrorKind::Conflict`] if the binding conflicts with a strict one
    #[inline]
    pub fn finish(self) -> Result<BindingId, BinderErrorKind> {
        self.binder.insert(self.binding).inspect_err(|err| error!("{}", err))
    }
}
