use alloc::{borrow::Cow, string::String};
use core::fmt::{self, Display, Formatter};

use crate::any::TypeInfo;

/// Identity used to look up bindings.
///
/// A binding is addressed by one or more keys and an optional name, and names are keys too:
/// any value that can be compared for equality works as either.
///
/// # Examples
/// ```rust
/// use bindery::{Key, TypeInfo};
///
/// trait Repo {}
///
/// let by_type = Key::of::<dyn Repo>();
/// let by_name = Key::from("primary");
/// let by_number = Key::from(42i64);
///
/// assert_eq!(by_type, Key::Type(TypeInfo::of::<dyn Repo>()));
/// assert_ne!(by_name, by_number);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Key {
    Type(TypeInfo),
    Str(Cow<'static, str>),
    Int(i64),
    /// Enum-like key: the owning type plus a discriminant
    Variant(TypeInfo, i64),
}

impl Key {
    #[inline]
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::Type(TypeInfo::of::<T>())
    }

    #[inline]
    #[must_use]
    pub fn variant<T: ?Sized + 'static>(discriminant: i64) -> Self {
        Self::Variant(TypeInfo::of::<T>(), discriminant)
    }

    #[inline]
    #[must_use]
    pub const fn as_type(&self) -> Option<&TypeInfo> {
        match self {
            Self::Type(type_info) => Some(type_info),
            _ => None,
        }
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Type(type_info) => write!(f, "{type_info}"),
            Self::Str(value) => write!(f, "\"{value}\""),
            Self::Int(value) => write!(f, "{value}"),
            Self::Variant(type_info, discriminant) => write!(f, "{}::{discriminant}", type_info.short_name()),
        }
    }
}

impl From<TypeInfo> for Key {
    fn from(value: TypeInfo) -> Self {
        Self::Type(value)
    }
}

impl From<&'static str> for Key {
    fn from(value: &'static str) -> Self {
        Self::Str(Cow::Borrowed(value))
    }
}

impl From<String> for Key {
    fn from(value: String) -> Self {
        Self::Str(Cow::Owned(value))
    }
}

impl From<i64> for Key {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for Key {
    fn from(value: i32) -> Self {
        Self::Int(value.into())
    }
}
