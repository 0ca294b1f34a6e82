use alloc::{boxed::Box, string::String};
use core::fmt::Write as _;

use super::{BinderErrorKind, InstantiateErrorKind, ReflectionErrorKind};
use crate::{any::TypeInfo, key::Key};

#[derive(thiserror::Error, Debug)]
pub enum InjectionErrorKind {
    #[error("No binding found for {type_info} (name: {name:?})")]
    NullBinding { type_info: TypeInfo, name: Option<Key> },
    #[error("Binding value of type {value} can't satisfy {type_info}. Declare the cast with `Descriptor::implements`")]
    IllegalBindingValue { type_info: TypeInfo, value: TypeInfo },
    #[error("{type_info} isn't instantiable. Bind it to a type with a constructor")]
    NotInstantiable { type_info: TypeInfo },
    #[error("Circular dependency detected: {}", display_path(.path))]
    CircularDependency { path: Box<[TypeInfo]> },
    #[error("Constructor of {type_info} failed: {source}")]
    Instantiate {
        type_info: TypeInfo,
        #[source]
        source: InstantiateErrorKind,
    },
    #[error(transparent)]
    Binder(#[from] BinderErrorKind),
    #[error(transparent)]
    Reflection(#[from] ReflectionErrorKind),
}

fn display_path(path: &[TypeInfo]) -> String {
    let mut out = String::new();
    for (index, type_info) in path.iter().enumerate() {
        if index != 0 {
            out.push_str(" -> ");
        }
        let _ = write!(out, "{}", type_info.short_name());
    }
    out
}
