use crate::{any::TypeInfo, key::Key};

/// Injection point: the requested type plus the name of the binding to use
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Dependency {
    pub type_info: TypeInfo,
    pub name: Option<Key>,
}

impl Dependency {
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            name: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn named<T: ?Sized + 'static>(name: impl Into<Key>) -> Self {
        Self {
            type_info: TypeInfo::of::<T>(),
            name: Some(name.into()),
        }
    }
}
