mod binder;
mod injection;
mod instantiate;
mod reflection;

pub use binder::BinderErrorKind;
pub use injection::InjectionErrorKind;
pub use instantiate::InstantiateErrorKind;
pub use reflection::ReflectionErrorKind;
