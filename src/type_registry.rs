use alloc::{collections::BTreeMap, string::String, sync::Arc};
use core::fmt::{self, Debug, Formatter};
use parking_lot::Mutex;

use crate::{
    any::TypeInfo,
    descriptor::{erase, Injectable, RawClass},
};

/// Constructible type: its identity plus a way to describe it
#[derive(Clone, Copy)]
pub struct Provider {
    type_info: TypeInfo,
    describe: fn() -> RawClass,
}

impl Provider {
    #[inline]
    #[must_use]
    pub fn of<T: Injectable>() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            describe: erase::<T>,
        }
    }

    #[inline]
    #[must_use]
    pub const fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    #[inline]
    #[must_use]
    pub(crate) fn describe(&self) -> RawClass {
        (self.describe)()
    }
}

impl PartialEq for Provider {
    fn eq(&self, other: &Self) -> bool {
        self.type_info == other.type_info
    }
}

impl Debug for Provider {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Provider").field(&self.type_info.name).finish()
    }
}

#[derive(Default)]
struct Registered {
    names: BTreeMap<String, TypeInfo>,
    providers: BTreeMap<TypeInfo, Option<Provider>>,
}

/// Types known to a binder.
///
/// Used to bind concrete types implicitly, to find casts of pre-built values
/// and to resolve type names of runtime bindings.
/// Names are fully qualified, a trailing `", Assembly"` qualifier is ignored on lookup.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    inner: Arc<Mutex<Registered>>,
}

impl TypeRegistry {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the type under its [`core::any::type_name`]
    pub fn register<T: Injectable>(&self) -> TypeInfo {
        let type_info = TypeInfo::of::<T>();
        self.insert(type_info.name.into(), type_info, Some(Provider::of::<T>()));
        type_info
    }

    /// Registers the type under an explicit name, in addition to its [`core::any::type_name`]
    pub fn register_as<T: Injectable>(&self, name: impl Into<String>) -> TypeInfo {
        let type_info = self.register::<T>();
        self.insert(name.into(), type_info, Some(Provider::of::<T>()));
        type_info
    }

    /// Registers a type that can only be used as a key, e.g. `dyn Trait`
    pub fn register_key<K: ?Sized + 'static>(&self) -> TypeInfo {
        let type_info = TypeInfo::of::<K>();
        self.insert(type_info.name.into(), type_info, None);
        type_info
    }

    pub fn register_key_as<K: ?Sized + 'static>(&self, name: impl Into<String>) -> TypeInfo {
        let type_info = self.register_key::<K>();
        self.insert(name.into(), type_info, None);
        type_info
    }

    fn insert(&self, name: String, type_info: TypeInfo, provider: Option<Provider>) {
        let mut registered = self.inner.lock();
        registered.names.insert(name, type_info);
        let slot = registered.providers.entry(type_info).or_insert(None);
        if provider.is_some() {
            *slot = provider;
        }
    }

    /// Finds a type by its fully qualified name
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<TypeInfo> {
        let registered = self.inner.lock();
        if let Some(type_info) = registered.names.get(name.trim()) {
            return Some(*type_info);
        }
        // `Name, Assembly`, but not the comma of generic arguments
        name.rsplit_once(',')
            .filter(|(_, assembly)| !assembly.contains('>'))
            .and_then(|(name, _)| registered.names.get(name.trim()))
            .copied()
    }

    #[must_use]
    pub fn provider(&self, type_info: &TypeInfo) -> Option<Provider> {
        self.inner.lock().providers.get(type_info).copied().flatten()
    }

    #[must_use]
    pub fn contains(&self, type_info: &TypeInfo) -> bool {
        self.inner.lock().providers.contains_key(type_info)
    }
}
