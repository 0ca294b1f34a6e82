use alloc::vec::Vec;
use tracing::debug;

use crate::{
    any::TypeInfo,
    dependency_resolver::DependencyResolver,
    descriptor::Caster,
    errors::InjectionErrorKind,
    injection_binding::{InjectionBinding, InjectionKind, InjectionValue, Instance},
    reflector::Reflector,
    service::Service as _,
    type_registry::{Provider, TypeRegistry},
};

/// Types currently under construction, outermost first
#[derive(Debug, Clone, Default)]
pub struct ResolveStack {
    in_progress: Vec<TypeInfo>,
}

impl ResolveStack {
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self { in_progress: Vec::new() }
    }

    /// # Errors
    /// Returns [`InjectionErrorKind::CircularDependency`] with the path from the first
    /// occurrence of the type back to itself
    pub(crate) fn enter(&mut self, type_info: TypeInfo) -> Result<(), InjectionErrorKind> {
        if let Some(start) = self.in_progress.iter().position(|in_progress| *in_progress == type_info) {
            let mut path = self.in_progress[start..].to_vec();
            path.push(type_info);
            return Err(InjectionErrorKind::CircularDependency {
                path: path.into_boxed_slice(),
            });
        }
        self.in_progress.push(type_info);
        Ok(())
    }

    #[inline]
    pub(crate) fn exit(&mut self) {
        self.in_progress.pop();
    }

    #[inline]
    #[must_use]
    pub fn depth(&self) -> usize {
        self.in_progress.len()
    }
}

/// Turns bindings into populated instances
#[derive(Clone, Default)]
pub struct Injector {
    reflector: Reflector,
}

impl Injector {
    #[inline]
    #[must_use]
    pub const fn new(reflector: Reflector) -> Self {
        Self { reflector }
    }

    #[inline]
    #[must_use]
    pub const fn reflector(&self) -> &Reflector {
        &self.reflector
    }

    /// Produces the binding's instance as `Arc<K>` for the requested key `K`.
    ///
    /// Pre-built values are returned as-is, singletons are constructed once and cached on the binding.
    /// Dependencies of constructed types are asked from the resolver with the constructed type as consumer.
    /// A singleton is cached only after its setters and post-construct hooks ran, so singletons depending
    /// on each other through setters fail with [`InjectionErrorKind::CircularDependency`].
    ///
    /// # Errors
    /// - Returns [`InjectionErrorKind::NotInstantiable`] if the binding has no constructible value
    /// - Returns [`InjectionErrorKind::CircularDependency`] if the type is already under construction
    /// - Returns [`InjectionErrorKind::IllegalBindingValue`] if the value can't be cast to the key
    /// - Returns any error of reflection, dependency resolution or the constructor
    pub fn instantiate<R>(
        &self,
        resolver: &R,
        binding: &InjectionBinding,
        key: TypeInfo,
        stack: &mut ResolveStack,
    ) -> Result<Instance, InjectionErrorKind>
    where
        R: DependencyResolver + ?Sized,
    {
        let provider = match binding.value() {
            Some(InjectionValue::Type(provider)) => *provider,
            Some(InjectionValue::Instance(value)) => {
                return self.cast(resolver.types(), value.instance.clone(), value.type_info, key);
            }
            Some(InjectionValue::Abstract(type_info)) => {
                return Err(InjectionErrorKind::NotInstantiable { type_info: *type_info });
            }
            None => return Err(InjectionErrorKind::NotInstantiable { type_info: key }),
        };

        let instance = if binding.kind() == InjectionKind::Default {
            self.construct(resolver, &provider, stack)?
        } else {
            let cached = binding.meta.instance.lock().clone();
            if let Some(instance) = cached {
                debug!(type_name = provider.type_info().name, "Singleton taken from cache");
                instance
            } else {
                let instance = self.construct(resolver, &provider, stack)?;
                binding.meta.instance.lock().get_or_insert(instance).clone()
            }
        };

        self.cast(resolver.types(), instance, provider.type_info(), key)
    }

    fn construct<R>(&self, resolver: &R, provider: &Provider, stack: &mut ResolveStack) -> Result<Instance, InjectionErrorKind>
    where
        R: DependencyResolver + ?Sized,
    {
        stack.enter(provider.type_info())?;
        let result = self.construct_entered(resolver, provider, stack);
        stack.exit();
        result
    }

    fn construct_entered<R>(&self, resolver: &R, provider: &Provider, stack: &mut ResolveStack) -> Result<Instance, InjectionErrorKind>
    where
        R: DependencyResolver + ?Sized,
    {
        let class = self.reflector.get_provider(provider)?;
        let consumer = class.type_info();

        let args = class
            .constructor_params()
            .iter()
            .map(|param| resolver.resolve(param, consumer, stack))
            .collect::<Result<Vec<_>, _>>()?;
        let mut object = class.construct.clone().call(args)?;

        for setter in class.setters() {
            let value = resolver.resolve(setter.dependency(), consumer, stack)?;
            (setter.inject)(object.as_mut(), &value)?;
        }
        for post_construct in &class.post_constructs {
            (post_construct.invoke)(object.as_mut());
        }

        debug!(type_name = consumer.name, "Instantiated");

        class.into_instance(object).ok_or(InjectionErrorKind::IllegalBindingValue {
            type_info: consumer,
            value: consumer,
        })
    }

    /// Finds the cast from the value type to the key type declared with `Descriptor::implements`
    #[must_use]
    pub(crate) fn caster(&self, types: &TypeRegistry, from: TypeInfo, to: TypeInfo) -> Option<Caster> {
        if let Some(class) = self.reflector.cached(&from) {
            return class.caster(&to).cloned();
        }
        types
            .provider(&from)
            .and_then(|provider| provider.describe().implements.remove(&to))
    }

    fn cast(&self, types: &TypeRegistry, instance: Instance, from: TypeInfo, to: TypeInfo) -> Result<Instance, InjectionErrorKind> {
        if from == to {
            return Ok(instance);
        }
        self.caster(types, from, to)
            .and_then(|caster| caster(&instance))
            .ok_or(InjectionErrorKind::IllegalBindingValue { type_info: to, value: from })
    }
}
