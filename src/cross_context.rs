use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    any::TypeInfo,
    binder::Binder,
    binding::BindingId,
    errors::BinderErrorKind,
    injection_binding::{InjectionBinding, InjectionMeta, InjectionValue},
    key::Key,
};

/// Injection bindings plus the supply-chain index:
/// `suppliers[consumer][injected]` is the binding whose value is forced into `consumer`.
///
/// A binding with a supply list holds its `(key, name)` slots like a weak one: a later binding of the same
/// key and name takes them, and a supplier never takes a slot from a strict binding.
/// Suppliers without a slot are kept in `displaced` while the index refers to them.
#[derive(Debug, Default, Clone)]
pub(crate) struct BindingStore {
    binder: Binder<InjectionValue, InjectionMeta>,
    displaced: BTreeMap<BindingId, InjectionBinding>,
    suppliers: BTreeMap<TypeInfo, BTreeMap<TypeInfo, BindingId>>,
}

impl BindingStore {
    /// Stores the binding and indexes its supply list.
    /// An existing supplier of the same type for a consumer is kept while its binding is alive.
    /// Returns the stored binding, `None` if it was weak, without a supply list, and lost every slot.
    pub(crate) fn insert(&mut self, binding: InjectionBinding) -> Result<Option<InjectionBinding>, BinderErrorKind> {
        let supplier = (!binding.meta.supply.is_empty()).then(|| binding.clone());
        let keys = binding.keys().to_vec();
        let (id, dropped) = self
            .binder
            .insert_yielding(binding, |binding| !binding.meta.supply.is_empty())?;
        for (dropped_id, dropped) in dropped {
            if !dropped.meta.supply.is_empty() {
                debug!(supply = ?dropped.meta.supply, "Supplier displaced from its slot");
                self.displaced.insert(dropped_id, dropped);
            }
        }

        let stored = match (self.binder.binding(id), supplier) {
            (Some(stored), _) => stored.clone(),
            (None, Some(supplier)) => {
                debug!(supply = ?supplier.meta.supply, "Supplier stored without a slot");
                self.displaced.insert(id, supplier.clone());
                supplier
            }
            (None, None) => {
                self.prune_suppliers();
                return Ok(None);
            }
        };

        for consumer in &stored.meta.supply {
            for key in &keys {
                let Some(type_info) = key.as_type() else {
                    continue;
                };
                let alive = self
                    .suppliers
                    .get(consumer)
                    .and_then(|injected| injected.get(type_info))
                    .is_some_and(|supplier| self.is_alive(*supplier));
                if !alive {
                    self.suppliers.entry(*consumer).or_default().insert(*type_info, id);
                }
            }
        }
        self.prune_suppliers();

        Ok(Some(stored))
    }

    fn is_alive(&self, id: BindingId) -> bool {
        self.binder.binding(id).is_some() || self.displaced.contains_key(&id)
    }

    #[inline]
    pub(crate) fn get(&self, key: &Key, name: Option<&Key>) -> Option<InjectionBinding> {
        self.binder.get_binding(key, name).cloned()
    }

    pub(crate) fn supplier(&self, injected: TypeInfo, consumer: TypeInfo) -> Option<InjectionBinding> {
        let id = *self.suppliers.get(&consumer)?.get(&injected)?;
        self.binder.binding(id).or_else(|| self.displaced.get(&id)).cloned()
    }

    /// Removes the `(key, name)` slot, returning the binding that occupied it
    pub(crate) fn unbind(&mut self, key: &Key, name: Option<&Key>) -> Option<InjectionBinding> {
        let binding = self.get(key, name)?;
        self.binder.unbind(key, name);
        self.prune_suppliers();
        Some(binding)
    }

    /// Removes the stored binding sharing the meta of the passed one under all of its keys
    pub(crate) fn unbind_binding(&mut self, binding: &InjectionBinding) -> bool {
        let displaced = self
            .displaced
            .iter()
            .find_map(|(id, stored)| stored.meta.same_binding(&binding.meta).then_some(*id));
        if let Some(id) = displaced {
            self.displaced.remove(&id);
            self.prune_suppliers();
            return true;
        }

        let id = binding.keys().iter().find_map(|key| {
            self.binder
                .get_binding_id(key, binding.name())
                .filter(|id| self.binder.binding(*id).is_some_and(|stored| stored.meta.same_binding(&binding.meta)))
        });
        let Some(id) = id else {
            return false;
        };
        self.binder.unbind_binding(id);
        self.prune_suppliers();
        true
    }

    /// Removes the supplier entry and the consumer from its binding's supply list
    pub(crate) fn unsupply(&mut self, injected: TypeInfo, consumer: TypeInfo) -> bool {
        let Some(id) = self
            .suppliers
            .get_mut(&consumer)
            .and_then(|suppliers| suppliers.remove(&injected))
        else {
            return false;
        };
        if let Some(binding) = self.binder.binding_mut(id) {
            binding.meta.supply.retain(|supplied| *supplied != consumer);
        }
        if let Some(binding) = self.displaced.get_mut(&id) {
            binding.meta.supply.retain(|supplied| *supplied != consumer);
        }
        self.prune_suppliers();
        debug!(injected = injected.name, consumer = consumer.name, "Supplier removed");
        true
    }

    /// Drops index entries of removed bindings, then displaced suppliers nothing refers to
    fn prune_suppliers(&mut self) {
        let (binder, displaced) = (&self.binder, &self.displaced);
        self.suppliers.retain(|_, suppliers| {
            suppliers.retain(|_, id| binder.binding(*id).is_some() || displaced.contains_key(id));
            !suppliers.is_empty()
        });

        let suppliers = &self.suppliers;
        self.displaced
            .retain(|id, _| suppliers.values().any(|injected| injected.values().any(|supplier| supplier == id)));
    }

    /// Bindings occupying slots, then displaced suppliers
    pub(crate) fn bindings(&self) -> impl Iterator<Item = &InjectionBinding> {
        self.binder
            .iter()
            .map(|(_, binding)| binding)
            .chain(self.displaced.values())
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.binder.len() + self.displaced.len()
    }
}

/// Storage of cross-context bindings shared by every binder created with it.
///
/// Clones point to the same storage.
/// Binders consult their own bindings first, so a local binding shadows a shared one.
#[derive(Debug, Clone, Default)]
pub struct CrossContextStore {
    pub(crate) inner: Arc<Mutex<BindingStore>>,
}

impl CrossContextStore {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the shared bindings
    #[must_use]
    pub fn bindings(&self) -> Vec<InjectionBinding> {
        self.inner.lock().bindings().cloned().collect()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
