use alloc::{collections::BTreeMap, string::String, sync::Arc, vec::Vec};
use parking_lot::Mutex;
use tracing::{debug, debug_span, error, info_span};

use crate::{
    any::TypeInfo,
    binding::{Constraint, Strength},
    cross_context::{BindingStore, CrossContextStore},
    dependency::Dependency,
    dependency_resolver::DependencyResolver,
    descriptor::Injectable,
    errors::{BinderErrorKind, InjectionErrorKind, ReflectionErrorKind},
    injection_binding::{InjectionBinding, InjectionKind, InjectionMeta, InjectionValue, Instance, ValueInstance},
    injector::{Injector, ResolveStack},
    key::Key,
    reflector::Reflector,
    runtime::{self, RuntimeBinding, RuntimeOption, RuntimeValue},
    type_registry::{Provider, TypeRegistry},
};

/// Binder of types to the way their instances are produced.
///
/// Every binder has its own bindings and shares cross-context bindings, the reflection cache and
/// the type registry with the binders created by [`Self::child`] or with the same [`CrossContextStore`].
/// Own bindings shadow cross-context ones.
///
/// Resolution of a dependency of a consumer type checks, in order:
/// 1. the supplier of the dependency type for the consumer, see [`InjectionBindingBuilder::supply_to`];
/// 2. the binding of the dependency type and name;
/// 3. an implicit binding of an unnamed dependency to itself, if the type is registered with a provider.
pub struct InjectionBinder {
    local: Mutex<BindingStore>,
    cross_context: CrossContextStore,
    injector: Injector,
    types: TypeRegistry,
    whitelist: Mutex<Option<Vec<RuntimeValue>>>,
}

impl Default for InjectionBinder {
    fn default() -> Self {
        Self::new()
    }
}

impl InjectionBinder {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::with_cross_context(CrossContextStore::new())
    }

    #[must_use]
    pub fn with_cross_context(cross_context: CrossContextStore) -> Self {
        Self {
            local: Mutex::new(BindingStore::default()),
            cross_context,
            injector: Injector::default(),
            types: TypeRegistry::new(),
            whitelist: Mutex::new(None),
        }
    }

    /// Creates a binder without own bindings sharing the cross-context store,
    /// the reflection cache and the type registry with this one
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            local: Mutex::new(BindingStore::default()),
            cross_context: self.cross_context.clone(),
            injector: self.injector.clone(),
            types: self.types.clone(),
            whitelist: Mutex::new(None),
        }
    }

    #[inline]
    #[must_use]
    pub const fn cross_context_store(&self) -> &CrossContextStore {
        &self.cross_context
    }

    #[inline]
    #[must_use]
    pub const fn injector(&self) -> &Injector {
        &self.injector
    }

    #[inline]
    #[must_use]
    pub const fn reflector(&self) -> &Reflector {
        self.injector.reflector()
    }

    #[inline]
    #[must_use]
    pub const fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// Registers the type, so it can be bound implicitly and named in runtime bindings
    #[inline]
    pub fn register<T: Injectable>(&self) -> TypeInfo {
        self.types.register::<T>()
    }

    #[inline]
    pub fn register_as<T: Injectable>(&self, name: impl Into<String>) -> TypeInfo {
        self.types.register_as::<T>(name)
    }

    #[inline]
    pub fn register_key<K: ?Sized + 'static>(&self) -> TypeInfo {
        self.types.register_key::<K>()
    }

    #[inline]
    pub fn register_key_as<K: ?Sized + 'static>(&self, name: impl Into<String>) -> TypeInfo {
        self.types.register_key_as::<K>(name)
    }

    /// Starts a binding for `K`. Nothing is stored until [`InjectionBindingBuilder::finish`] is called.
    #[inline]
    #[must_use]
    pub fn bind<K: ?Sized + 'static>(&self) -> InjectionBindingBuilder<'_> {
        self.bind_type(TypeInfo::of::<K>())
    }

    #[must_use]
    pub fn bind_type(&self, type_info: TypeInfo) -> InjectionBindingBuilder<'_> {
        let mut binding = InjectionBinding::with_meta(Key::Type(type_info), InjectionMeta::default());
        binding.set_constraint(Constraint::One);
        InjectionBindingBuilder { binder: self, binding }
    }

    #[inline]
    #[must_use]
    pub fn get_binding<K: ?Sized + 'static>(&self) -> Option<InjectionBinding> {
        self.get_binding_by(TypeInfo::of::<K>(), None)
    }

    #[inline]
    #[must_use]
    pub fn get_named_binding<K: ?Sized + 'static>(&self, name: impl Into<Key>) -> Option<InjectionBinding> {
        self.get_binding_by(TypeInfo::of::<K>(), Some(&name.into()))
    }

    /// Own binding for the type and name, otherwise the cross-context one
    #[must_use]
    pub fn get_binding_by(&self, type_info: TypeInfo, name: Option<&Key>) -> Option<InjectionBinding> {
        let key = Key::Type(type_info);
        let local = self.local.lock().get(&key, name);
        local.or_else(|| self.cross_context.inner.lock().get(&key, name))
    }

    /// Resolves the unnamed binding of `K` into an instance.
    ///
    /// A type without a binding is bound implicitly only if it's registered, see [`Self::register`],
    /// [`InjectionBindingBuilder::to`] and [`Self::scan`]. Use [`Self::get_injectable`] to register it on request.
    ///
    /// # Errors
    /// - Returns [`InjectionErrorKind::NullBinding`] if neither `K` nor one of its dependencies can be resolved
    /// - Returns [`InjectionErrorKind::CircularDependency`] if a type depends on itself
    /// - Returns any other error of the construction, see [`Injector::instantiate`]
    #[inline]
    pub fn get_instance<K: ?Sized + Send + Sync + 'static>(&self) -> Result<Arc<K>, InjectionErrorKind> {
        self.get_instance_by::<K>(None)
    }

    /// Resolves the binding of `K` with the name into an instance.
    /// Named and unnamed bindings of the same type never substitute each other.
    ///
    /// # Errors
    /// See [`Self::get_instance`]
    #[inline]
    pub fn get_named_instance<K: ?Sized + Send + Sync + 'static>(&self, name: impl Into<Key>) -> Result<Arc<K>, InjectionErrorKind> {
        self.get_instance_by::<K>(Some(&name.into()))
    }

    /// Registers `T` and resolves its unnamed binding, so a type without a binding is bound implicitly.
    /// Dependencies of `T` are still bound implicitly only if they're registered.
    ///
    /// # Errors
    /// See [`Self::get_instance`]
    #[inline]
    pub fn get_injectable<T: Injectable>(&self) -> Result<Arc<T>, InjectionErrorKind> {
        if self.types.provider(&TypeInfo::of::<T>()).is_none() {
            self.types.register::<T>();
        }
        self.get_instance::<T>()
    }

    fn get_instance_by<K: ?Sized + Send + Sync + 'static>(&self, name: Option<&Key>) -> Result<Arc<K>, InjectionErrorKind> {
        let type_info = TypeInfo::of::<K>();
        let span = info_span!("get_instance", key = type_info.name, name = ?name);
        let _guard = span.enter();

        let instance = self
            .resolve_key(type_info, name, None, &mut ResolveStack::new())
            .inspect_err(|err| error!("{}", err))?;

        if let Some(instance) = instance.downcast_ref::<Arc<K>>() {
            debug!("Resolved");
            return Ok(instance.clone());
        }

        let err = InjectionErrorKind::IllegalBindingValue { type_info, value: type_info };
        error!("{}", err);
        Err(err)
    }

    fn resolve_key(
        &self,
        type_info: TypeInfo,
        name: Option<&Key>,
        consumer: Option<TypeInfo>,
        stack: &mut ResolveStack,
    ) -> Result<Instance, InjectionErrorKind> {
        if let Some(consumer) = consumer {
            if let Some(supplier) = self.get_supplier_by(type_info, consumer) {
                debug!(dependency = type_info.name, consumer = consumer.name, "Supplied");
                return self.injector.instantiate(self, &supplier, type_info, stack);
            }
        }

        if let Some(binding) = self.get_binding_by(type_info, name) {
            return self.injector.instantiate(self, &binding, type_info, stack);
        }

        if name.is_none() {
            if let Some(binding) = self.implicit_binding(type_info)? {
                return self.injector.instantiate(self, &binding, type_info, stack);
            }
        }

        Err(InjectionErrorKind::NullBinding {
            type_info,
            name: name.cloned(),
        })
    }

    /// Binds a registered constructible type to itself as a weak default binding
    fn implicit_binding(&self, type_info: TypeInfo) -> Result<Option<InjectionBinding>, InjectionErrorKind> {
        let Some(provider) = self.types.provider(&type_info) else {
            return Ok(None);
        };

        let mut binding = InjectionBinding::with_meta(Key::Type(type_info), InjectionMeta::default());
        binding.set_constraint(Constraint::One);
        binding.push_value(InjectionValue::Type(provider));
        binding.strength = Strength::Weak;

        let stored = self.local.lock().insert(binding)?;
        debug!(type_name = type_info.name, "Implicit binding created");
        Ok(stored)
    }

    /// Removes the unnamed binding of `K`.
    /// An own binding is removed first, only if there is none the cross-context one is removed for all binders.
    #[inline]
    pub fn unbind<K: ?Sized + 'static>(&self) -> Option<InjectionBinding> {
        self.unbind_by(TypeInfo::of::<K>(), None)
    }

    #[inline]
    pub fn unbind_named<K: ?Sized + 'static>(&self, name: impl Into<Key>) -> Option<InjectionBinding> {
        self.unbind_by(TypeInfo::of::<K>(), Some(&name.into()))
    }

    pub fn unbind_by(&self, type_info: TypeInfo, name: Option<&Key>) -> Option<InjectionBinding> {
        let key = Key::Type(type_info);
        let local = self.local.lock().unbind(&key, name);
        let unbound = local.or_else(|| self.cross_context.inner.lock().unbind(&key, name));
        if unbound.is_some() {
            debug!(key = type_info.name, name = ?name, "Unbound");
        }
        unbound
    }

    /// Removes the stored binding the passed one was returned for, under all of its keys
    pub fn unbind_binding(&self, binding: &InjectionBinding) -> bool {
        if binding.is_cross_context() {
            return self.cross_context.inner.lock().unbind_binding(binding);
        }
        self.local.lock().unbind_binding(binding)
    }

    /// Binding supplied to `Consumer` for its dependencies of type `Injected`
    #[inline]
    #[must_use]
    pub fn get_supplier<Injected: ?Sized + 'static, Consumer: ?Sized + 'static>(&self) -> Option<InjectionBinding> {
        self.get_supplier_by(TypeInfo::of::<Injected>(), TypeInfo::of::<Consumer>())
    }

    #[must_use]
    pub fn get_supplier_by(&self, injected: TypeInfo, consumer: TypeInfo) -> Option<InjectionBinding> {
        let local = self.local.lock().supplier(injected, consumer);
        local.or_else(|| self.cross_context.inner.lock().supplier(injected, consumer))
    }

    /// Stops supplying `Injected` to `Consumer`, also removing `Consumer` from the supply list of the binding.
    /// Returns `false` if there was no such supplier.
    pub fn unsupply<Injected: ?Sized + 'static, Consumer: ?Sized + 'static>(&self) -> bool {
        let (injected, consumer) = (TypeInfo::of::<Injected>(), TypeInfo::of::<Consumer>());
        self.local.lock().unsupply(injected, consumer) || self.cross_context.inner.lock().unsupply(injected, consumer)
    }

    fn bindings(&self) -> Vec<InjectionBinding> {
        let mut bindings: Vec<_> = self.local.lock().bindings().cloned().collect();
        bindings.extend(self.cross_context.bindings());
        bindings
    }

    /// Warms the reflection cache with the value types of all bindings, own and cross-context.
    /// Pre-built values of types without a provider (e.g. primitives) and of abstract types are skipped.
    /// Returns the number of distinct reflected types.
    ///
    /// # Errors
    /// Returns [`InjectionErrorKind::Reflection`] if a bound type can't be reflected
    pub fn reflect_all(&self) -> Result<usize, InjectionErrorKind> {
        let mut providers = BTreeMap::new();
        for binding in self.bindings() {
            for value in binding.values() {
                match value {
                    InjectionValue::Type(provider) => {
                        providers.insert(provider.type_info(), (*provider, false));
                    }
                    InjectionValue::Instance(value) => {
                        if let Some(provider) = self.types.provider(&value.type_info()) {
                            providers.entry(provider.type_info()).or_insert((provider, true));
                        }
                    }
                    InjectionValue::Abstract(_) => {}
                }
            }
        }

        let mut count = 0;
        for (provider, pre_built) in providers.into_values() {
            match self.reflector().get_provider(&provider) {
                Ok(_) => count += 1,
                Err(ReflectionErrorKind::CannotReflectInterface { .. }) if pre_built => {}
                Err(err) => {
                    error!("{}", err);
                    return Err(err.into());
                }
            }
        }
        debug!(count, "Reflected all bindings");
        Ok(count)
    }

    /// Warms the reflection cache with the types.
    /// Types unknown to the registry (e.g. primitives) are skipped.
    /// Returns the number of reflected types.
    ///
    /// # Errors
    /// Returns [`ReflectionErrorKind::CannotReflectInterface`] for types registered without a provider,
    /// and any other reflection error
    pub fn reflect(&self, types: &[TypeInfo]) -> Result<usize, InjectionErrorKind> {
        let mut count = 0;
        for type_info in types {
            if let Some(provider) = self.types.provider(type_info) {
                self.reflector()
                    .get_provider(&provider)
                    .inspect_err(|err| error!("{}", err))?;
                count += 1;
            } else if self.types.contains(type_info) {
                let err = ReflectionErrorKind::CannotReflectInterface { type_info: *type_info };
                error!("{}", err);
                return Err(err.into());
            }
        }
        Ok(count)
    }

    /// Binds `T` as a weak singleton under each type it implements (or itself) if `T` declares
    /// [`crate::Descriptor::implicit_binding`]. Explicit bindings override such bindings.
    /// Returns `false` if `T` doesn't declare it.
    ///
    /// # Errors
    /// Returns any error of [`InjectionBindingBuilder::finish`]
    pub fn scan<T: Injectable>(&self) -> Result<bool, InjectionErrorKind> {
        let provider = Provider::of::<T>();
        let class = provider.describe();
        let Some(implicit) = class.implicit else {
            return Ok(false);
        };

        self.types.register::<T>();

        let mut keys: Vec<_> = class.implements.keys().copied().collect();
        if keys.is_empty() {
            keys.push(provider.type_info());
        }
        let mut keys = keys.into_iter();
        let Some(first) = keys.next() else {
            return Ok(false);
        };

        let mut builder = keys
            .fold(self.bind_type(first), InjectionBindingBuilder::bind_type)
            .to_provider(provider)
            .to_singleton()
            .weak();
        if implicit.cross_context {
            builder = builder.cross_context();
        }
        builder.finish()?;

        debug!(type_name = provider.type_info().name, "Scanned");
        Ok(true)
    }

    /// Restricts `To` values accepted by [`Self::consume_bindings`]
    pub fn whitelist_bindings(&self, whitelist: Vec<RuntimeValue>) {
        *self.whitelist.lock() = Some(whitelist);
    }

    /// Applies runtime bindings, see [`crate::runtime`].
    /// Type names are resolved through the type registry.
    /// The records are applied all or nothing: if one of them fails, own and cross-context bindings are left as they were.
    ///
    /// # Errors
    /// - Returns parse errors of [`runtime::parse`]
    /// - Returns [`BinderErrorKind::RuntimeFailedWhitelistCheck`] if a whitelist is set and a `To` value is missing from it
    /// - Returns [`BinderErrorKind::RuntimeNullValue`] if a type name isn't registered
    /// - Returns [`BinderErrorKind::RuntimeTooManyValues`] if a record has more than one `To` value
    /// - Returns any error of [`InjectionBindingBuilder::finish`], including conflicts between the records
    pub fn consume_bindings(&self, json: &str) -> Result<Vec<InjectionBinding>, InjectionErrorKind> {
        self.consume(json).inspect_err(|err| error!("{}", err))
    }

    fn consume(&self, json: &str) -> Result<Vec<InjectionBinding>, InjectionErrorKind> {
        let records = runtime::parse(json)?;
        if let Some(whitelist) = self.whitelist.lock().as_deref() {
            runtime::check_whitelist(&records, whitelist)?;
        }

        let resolved = records
            .iter()
            .map(|record| self.resolve_record(record))
            .collect::<Result<Vec<_>, _>>()?;

        let local = self.local.lock().clone();
        let shared = self.cross_context.inner.lock().clone();
        let applied = self.apply_records(resolved);
        if applied.is_err() {
            *self.local.lock() = local;
            *self.cross_context.inner.lock() = shared;
        }
        applied
    }

    fn apply_records(&self, records: Vec<ResolvedRecord>) -> Result<Vec<InjectionBinding>, InjectionErrorKind> {
        let mut bindings = Vec::with_capacity(records.len());
        for record in records {
            let Some((first, rest)) = record.keys.split_first() else {
                return Err(BinderErrorKind::RuntimeNoBind.into());
            };
            let mut builder = rest
                .iter()
                .fold(self.bind_type(*first), |builder, key| builder.bind_type(*key));
            if let Some(value) = record.value {
                builder = builder.value(value);
            }
            if let Some(name) = record.name {
                builder = builder.to_name(name);
            }
            if record.singleton {
                builder = builder.to_singleton();
            }
            if record.weak {
                builder = builder.weak();
            }
            if record.cross_context {
                builder = builder.cross_context();
            }
            for consumer in record.supply {
                builder = builder.supply_to_type(consumer);
            }
            bindings.push(builder.insert()?);
        }
        debug!(count = bindings.len(), "Runtime bindings consumed");
        Ok(bindings)
    }

    fn resolve_type(&self, value: &RuntimeValue) -> Result<TypeInfo, BinderErrorKind> {
        value
            .as_str()
            .and_then(|name| self.types.lookup(name))
            .ok_or_else(|| BinderErrorKind::RuntimeNullValue { value: value.clone() })
    }

    fn resolve_record(&self, record: &RuntimeBinding) -> Result<ResolvedRecord, BinderErrorKind> {
        let keys = record
            .bind
            .iter()
            .map(|value| self.resolve_type(value))
            .collect::<Result<Vec<_>, _>>()?;
        if keys.is_empty() {
            return Err(BinderErrorKind::RuntimeNoBind);
        }

        let value = match record.to.as_slice() {
            [] => None,
            [value] => {
                let type_info = self.resolve_type(value)?;
                Some(match self.types.provider(&type_info) {
                    Some(provider) => InjectionValue::Type(provider),
                    None => InjectionValue::Abstract(type_info),
                })
            }
            values => return Err(BinderErrorKind::RuntimeTooManyValues { count: values.len() }),
        };

        Ok(ResolvedRecord {
            keys,
            value,
            name: record.to_name.clone().map(Key::from),
            singleton: record.has_option(&RuntimeOption::ToSingleton),
            weak: record.has_option(&RuntimeOption::Weak),
            cross_context: record.has_option(&RuntimeOption::CrossContext),
            supply: record
                .supply_to()
                .map(|value| self.resolve_type(value))
                .collect::<Result<_, _>>()?,
        })
    }

    /// Whether the value can be produced as `Arc<K>` for the key type `K`
    fn castable(&self, value: &InjectionValue, key: TypeInfo) -> bool {
        let from = value.type_info();
        if from == key {
            return true;
        }
        match value {
            InjectionValue::Type(provider) => self.reflector().cached(&from).map_or_else(
                || provider.describe().implements.contains_key(&key),
                |class| class.caster(&key).is_some(),
            ),
            InjectionValue::Instance(_) => self.injector.caster(&self.types, from, key).is_some(),
            InjectionValue::Abstract(_) => true,
        }
    }
}

struct ResolvedRecord {
    keys: Vec<TypeInfo>,
    value: Option<InjectionValue>,
    name: Option<Key>,
    singleton: bool,
    weak: bool,
    cross_context: bool,
    supply: Vec<TypeInfo>,
}

impl DependencyResolver for InjectionBinder {
    fn resolve(&self, dependency: &Dependency, consumer: TypeInfo, stack: &mut ResolveStack) -> Result<Instance, InjectionErrorKind> {
        let span = debug_span!("resolve", dependency = dependency.type_info.name, consumer = consumer.name);
        let _guard = span.enter();

        self.resolve_key(dependency.type_info, dependency.name.as_ref(), Some(consumer), stack)
    }

    fn types(&self) -> &TypeRegistry {
        &self.types
    }
}

/// Chained builder returned by [`InjectionBinder::bind`]
pub struct InjectionBindingBuilder<'a> {
    binder: &'a InjectionBinder,
    binding: InjectionBinding,
}

impl InjectionBindingBuilder<'_> {
    /// Adds another key to the same binding
    #[inline]
    #[must_use]
    pub fn bind<K: ?Sized + 'static>(self) -> Self {
        self.bind_type(TypeInfo::of::<K>())
    }

    #[inline]
    #[must_use]
    pub fn bind_type(mut self, type_info: TypeInfo) -> Self {
        self.binding.add_key(Key::Type(type_info));
        self
    }

    /// Binds to a type constructed on request. The type is registered in the binder.
    #[inline]
    #[must_use]
    pub fn to<C: Injectable>(self) -> Self {
        self.binder.types.register::<C>();
        self.to_provider(Provider::of::<C>())
    }

    #[must_use]
    pub fn to_provider(mut self, provider: Provider) -> Self {
        if self.binding.meta.kind == InjectionKind::Value {
            self.binding.meta.kind = InjectionKind::Default;
        }
        self.value(InjectionValue::Type(provider))
    }

    /// Binds to a pre-built value, which is returned as-is for every request.
    /// The binding stays a value binding even if [`Self::to_singleton`] is called.
    #[must_use]
    pub fn to_value<V: ?Sized + Send + Sync + 'static>(mut self, value: Arc<V>) -> Self {
        self.binding.meta.kind = InjectionKind::Value;
        self.value(InjectionValue::Instance(ValueInstance::new(value)))
    }

    fn value(mut self, value: InjectionValue) -> Self {
        self.binding.push_value(value);
        self
    }

    #[inline]
    #[must_use]
    pub fn to_name(mut self, name: impl Into<Key>) -> Self {
        self.binding.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn to_singleton(mut self) -> Self {
        if self.binding.meta.kind != InjectionKind::Value {
            self.binding.meta.kind = InjectionKind::Singleton;
        }
        self
    }

    /// Marks the binding as overridable by a later binding of the same key and name
    #[inline]
    #[must_use]
    pub fn weak(mut self) -> Self {
        self.binding.strength = Strength::Weak;
        self
    }

    /// Stores the binding in the cross-context store shared with other binders
    #[inline]
    #[must_use]
    pub fn cross_context(mut self) -> Self {
        self.binding.meta.cross_context = true;
        self
    }

    /// Forces the value of this binding into every dependency of type of the binding key declared by `C`
    #[inline]
    #[must_use]
    pub fn supply_to<C: ?Sized + 'static>(self) -> Self {
        self.supply_to_type(TypeInfo::of::<C>())
    }

    #[must_use]
    pub fn supply_to_type(mut self, consumer: TypeInfo) -> Self {
        if !self.binding.meta.supply.contains(&consumer) {
            self.binding.meta.supply.push(consumer);
        }
        self
    }

    /// Stores the binding.
    /// A binding without a value is bound to its first key: to the registered provider of the type, otherwise to nothing constructible.
    /// Returns the stored binding. A weak binding that lost every slot to strict ones isn't stored and is returned as built.
    ///
    /// # Errors
    /// - Returns [`InjectionErrorKind::IllegalBindingValue`] if the value can't be cast to one of the keys
    /// - Returns [`InjectionErrorKind::Binder`] with [`BinderErrorKind::Conflict`] if a key and name are already bound strictly
    pub fn finish(self) -> Result<InjectionBinding, InjectionErrorKind> {
        self.insert().inspect_err(|err| error!("{}", err))
    }

    fn insert(self) -> Result<InjectionBinding, InjectionErrorKind> {
        let Self { binder, mut binding } = self;

        if binding.values().is_empty() {
            if let Some(type_info) = binding.key().as_type().copied() {
                binding.push_value(match binder.types.provider(&type_info) {
                    Some(provider) => InjectionValue::Type(provider),
                    None => InjectionValue::Abstract(type_info),
                });
            }
        }

        if let Some(value) = binding.value() {
            for key in binding.keys().iter().filter_map(Key::as_type) {
                if !binder.castable(value, *key) {
                    return Err(InjectionErrorKind::IllegalBindingValue {
                        type_info: *key,
                        value: value.type_info(),
                    });
                }
            }
        }

        let stored = if binding.is_cross_context() {
            binder.cross_context.inner.lock().insert(binding.clone())
        } else {
            binder.local.lock().insert(binding.clone())
        }?;

        debug!(key = %binding.key(), kind = ?binding.kind(), "Bound");
        Ok(stored.unwrap_or(binding))
    }
}
