#![no_std]

extern crate alloc;

#[macro_use]
pub(crate) mod macros;

pub(crate) mod any;
pub(crate) mod binder;
pub(crate) mod binding;
pub(crate) mod cross_context;
pub(crate) mod dependency;
pub(crate) mod dependency_resolver;
pub(crate) mod descriptor;
pub(crate) mod errors;
pub(crate) mod injection_binder;
pub(crate) mod injection_binding;
pub(crate) mod injector;
pub(crate) mod key;
pub(crate) mod reflector;
pub(crate) mod service;
pub(crate) mod type_registry;

pub mod runtime;

pub use any::TypeInfo;
pub use binder::{Binder, BindingBuilder};
pub use binding::{Binding, BindingId, Constraint, Strength};
pub use cross_context::CrossContextStore;
pub use dependency::Dependency;
pub use dependency_resolver::DependencyResolver;
pub use descriptor::{
    Constructor, ConstructorDescriptor, Descriptor, ImplicitDescriptor, Injectable, PostConstructDescriptor, SetterDescriptor,
    Visibility,
};
pub use errors::{BinderErrorKind, InjectionErrorKind, InstantiateErrorKind, ReflectionErrorKind};
pub use injection_binder::{InjectionBinder, InjectionBindingBuilder};
pub use injection_binding::{Instance, InjectionBinding, InjectionKind, InjectionMeta, InjectionValue, ValueInstance};
pub use injector::{Injector, ResolveStack};
pub use key::Key;
pub use reflector::{Reflected, ReflectedClass, ReflectedSetter, Reflector};
pub use type_registry::{Provider, TypeRegistry};
