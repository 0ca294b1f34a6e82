use crate::{
    any::TypeInfo, dependency::Dependency, errors::InjectionErrorKind, injection_binding::Instance, injector::ResolveStack,
    type_registry::TypeRegistry,
};

/// Resolves injection points of a type under construction.
///
/// [`crate::Injector`] asks the resolver for every constructor parameter and setter of the consumer,
/// so the resolver decides which binding satisfies it (supply chains, names, implicit bindings).
pub trait DependencyResolver {
    /// Resolves the dependency for the consumer type.
    /// The returned instance holds `Arc<D>` where `D` is the type of [`Dependency::type_info`].
    ///
    /// # Errors
    /// Returns any error of the nested resolution, see [`InjectionErrorKind`]
    fn resolve(&self, dependency: &Dependency, consumer: TypeInfo, stack: &mut ResolveStack) -> Result<Instance, InjectionErrorKind>;

    /// Registry used to find casts of pre-built values
    fn types(&self) -> &TypeRegistry;
}
