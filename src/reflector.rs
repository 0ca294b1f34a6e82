use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
use core::{
    fmt::{self, Debug, Formatter},
    ops::Deref,
};
use parking_lot::Mutex;
use tracing::debug;

use crate::{
    any::TypeInfo,
    dependency::Dependency,
    descriptor::{
        Caster, ConstructService, ErasedObject, ErasedPostConstructFn, ErasedSetFn, Injectable, RawClass, RawConstructor,
        Visibility,
    },
    errors::ReflectionErrorKind,
    injection_binding::Instance,
    type_registry::Provider,
};

pub struct ReflectedSetter {
    member: &'static str,
    dependency: Dependency,
    pub(crate) inject: ErasedSetFn,
}

impl ReflectedSetter {
    #[inline]
    #[must_use]
    pub const fn member(&self) -> &'static str {
        self.member
    }

    #[inline]
    #[must_use]
    pub const fn dependency(&self) -> &Dependency {
        &self.dependency
    }
}

pub(crate) struct ReflectedPostConstruct {
    name: &'static str,
    pub(crate) invoke: ErasedPostConstructFn,
}

/// Validated shape of a type: the chosen constructor, injectable members in order,
/// post-construct hooks in order and casts
pub struct ReflectedClass {
    type_info: TypeInfo,
    params: Vec<Dependency>,
    pub(crate) construct: ConstructService,
    setters: Vec<ReflectedSetter>,
    pub(crate) post_constructs: Vec<ReflectedPostConstruct>,
    implements: BTreeMap<TypeInfo, Caster>,
    into_instance: fn(ErasedObject) -> Option<Instance>,
}

impl ReflectedClass {
    #[inline]
    #[must_use]
    pub const fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    /// Parameters of the chosen constructor
    #[inline]
    #[must_use]
    pub fn constructor_params(&self) -> &[Dependency] {
        &self.params
    }

    #[inline]
    #[must_use]
    pub fn setters(&self) -> &[ReflectedSetter] {
        &self.setters
    }

    pub fn post_constructs(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.post_constructs.iter().map(|post_construct| post_construct.name)
    }

    pub fn implements(&self) -> impl Iterator<Item = &TypeInfo> {
        self.implements.keys()
    }

    #[inline]
    pub(crate) fn caster(&self, to: &TypeInfo) -> Option<&Caster> {
        self.implements.get(to)
    }

    #[inline]
    pub(crate) fn into_instance(&self, object: ErasedObject) -> Option<Instance> {
        (self.into_instance)(object)
    }
}

impl Debug for ReflectedClass {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReflectedClass")
            .field("type_info", &self.type_info)
            .field("params", &self.params)
            .field("setters", &self.setters.iter().map(ReflectedSetter::member).collect::<Vec<_>>())
            .field("post_constructs", &self.post_constructs().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Picks the tagged constructor, otherwise the one with the fewest parameters.
/// A parameterless constructor is only picked when there is nothing else.
fn select_constructor(mut constructors: Vec<RawConstructor>) -> Option<RawConstructor> {
    let index = constructors
        .iter()
        .position(|constructor| constructor.tagged)
        .or_else(|| {
            constructors
                .iter()
                .enumerate()
                .filter(|(_, constructor)| !constructor.params.is_empty())
                .min_by_key(|(index, constructor)| (constructor.params.len(), *index))
                .map(|(index, _)| index)
        })
        .or_else(|| (!constructors.is_empty()).then_some(0))?;

    Some(constructors.swap_remove(index))
}

impl TryFrom<RawClass> for ReflectedClass {
    type Error = ReflectionErrorKind;

    fn try_from(raw: RawClass) -> Result<Self, Self::Error> {
        let type_info = raw.type_info;

        if let Some(setter) = raw.setters.iter().find(|setter| setter.visibility == Visibility::NonPublic) {
            return Err(ReflectionErrorKind::CannotInjectIntoNonpublicSetter {
                type_info,
                member: setter.member,
            });
        }

        let Some(RawConstructor { params, invoke, .. }) = select_constructor(raw.constructors) else {
            return Err(ReflectionErrorKind::CannotReflectInterface { type_info });
        };

        let mut post_constructs = raw.post_constructs;
        post_constructs.sort_by_key(|post_construct| post_construct.order);

        Ok(Self {
            type_info,
            params,
            construct: invoke,
            setters: raw
                .setters
                .into_iter()
                .map(|setter| ReflectedSetter {
                    member: setter.member,
                    dependency: setter.dependency,
                    inject: setter.inject,
                })
                .collect(),
            post_constructs: post_constructs
                .into_iter()
                .map(|post_construct| ReflectedPostConstruct {
                    name: post_construct.name,
                    invoke: post_construct.invoke,
                })
                .collect(),
            implements: raw.implements,
            into_instance: raw.into_instance,
        })
    }
}

/// Result of [`Reflector::get`]
#[derive(Clone)]
pub struct Reflected {
    class: Arc<ReflectedClass>,
    pre_generated: bool,
}

impl Reflected {
    /// Whether the class was taken from the cache
    #[inline]
    #[must_use]
    pub const fn is_pre_generated(&self) -> bool {
        self.pre_generated
    }

    #[inline]
    #[must_use]
    pub fn class(&self) -> &Arc<ReflectedClass> {
        &self.class
    }
}

impl Deref for Reflected {
    type Target = ReflectedClass;

    fn deref(&self) -> &Self::Target {
        &self.class
    }
}

impl Debug for Reflected {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reflected")
            .field("class", &self.class)
            .field("pre_generated", &self.pre_generated)
            .finish()
    }
}

/// Cache of reflected classes, shared by clones
#[derive(Clone, Default)]
pub struct Reflector {
    cache: Arc<Mutex<BTreeMap<TypeInfo, Arc<ReflectedClass>>>>,
}

impl Reflector {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reflects the type once, returning the cached class on subsequent calls.
    ///
    /// # Errors
    /// - Returns [`ReflectionErrorKind::CannotInjectIntoNonpublicSetter`] if a member isn't publicly settable
    /// - Returns [`ReflectionErrorKind::CannotReflectInterface`] if the type declares no constructor
    #[inline]
    pub fn get<T: Injectable>(&self) -> Result<Reflected, ReflectionErrorKind> {
        self.get_provider(&Provider::of::<T>())
    }

    /// Same as [`Self::get`], but for a type-erased provider
    ///
    /// # Errors
    /// See [`Self::get`]
    pub fn get_provider(&self, provider: &Provider) -> Result<Reflected, ReflectionErrorKind> {
        let type_info = provider.type_info();

        if let Some(class) = self.cached(&type_info) {
            return Ok(Reflected {
                class,
                pre_generated: true,
            });
        }

        let class = Arc::new(ReflectedClass::try_from(provider.describe())?);
        debug!(type_name = type_info.name, "Reflected");

        let class = self.cache.lock().entry(type_info).or_insert(class).clone();
        Ok(Reflected {
            class,
            pre_generated: false,
        })
    }

    #[inline]
    #[must_use]
    pub fn cached(&self, type_info: &TypeInfo) -> Option<Arc<ReflectedClass>> {
        self.cache.lock().get(type_info).cloned()
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }
}
