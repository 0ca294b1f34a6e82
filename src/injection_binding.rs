use alloc::{sync::Arc, vec::Vec};
use core::{
    any::Any,
    fmt::{self, Debug, Formatter},
};
use parking_lot::Mutex;

use crate::{any::TypeInfo, binding::Binding, type_registry::Provider};

/// Type-erased instance.
/// For a key `K` it always holds `Arc<K>`, so it can be downcast with `downcast_ref::<Arc<K>>()`.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Pre-built value of a [`InjectionKind::Value`] binding
#[derive(Clone)]
pub struct ValueInstance {
    pub(crate) type_info: TypeInfo,
    pub(crate) instance: Instance,
    addr: usize,
}

impl ValueInstance {
    #[inline]
    #[must_use]
    pub fn new<V: ?Sized + Send + Sync + 'static>(value: Arc<V>) -> Self {
        Self {
            type_info: TypeInfo::of::<V>(),
            addr: Arc::as_ptr(&value).cast::<()>() as usize,
            instance: Arc::new(value),
        }
    }

    #[inline]
    #[must_use]
    pub const fn type_info(&self) -> TypeInfo {
        self.type_info
    }

    #[inline]
    #[must_use]
    pub fn downcast<V: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<V>> {
        self.instance.downcast_ref::<Arc<V>>().cloned()
    }
}

/// Values are equal when they wrap the same allocation
impl PartialEq for ValueInstance {
    fn eq(&self, other: &Self) -> bool {
        self.type_info == other.type_info && self.addr == other.addr
    }
}

impl Debug for ValueInstance {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueInstance").field("type_info", &self.type_info).finish_non_exhaustive()
    }
}

/// Value of an injection binding
#[derive(Debug, Clone, PartialEq)]
pub enum InjectionValue {
    /// Type constructed on request
    Type(Provider),
    /// Pre-built instance
    Instance(ValueInstance),
    /// Type without a way to construct it, e.g. a trait registered by name
    Abstract(TypeInfo),
}

impl InjectionValue {
    #[inline]
    #[must_use]
    pub const fn type_info(&self) -> TypeInfo {
        match self {
            Self::Type(provider) => provider.type_info(),
            Self::Instance(value) => value.type_info,
            Self::Abstract(type_info) => *type_info,
        }
    }
}

/// Lifecycle of an injection binding.
/// ## Variants
/// - `Default`: a new instance per request
/// - `Singleton`: one instance per binding, created on first request
/// - `Value`: pre-built instance that is never constructed or post-constructed again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InjectionKind {
    #[default]
    Default,
    Singleton,
    Value,
}

/// Injection-specific part of a binding
#[derive(Clone, Default)]
pub struct InjectionMeta {
    pub(crate) kind: InjectionKind,
    pub(crate) cross_context: bool,
    pub(crate) supply: Vec<TypeInfo>,
    pub(crate) instance: Arc<Mutex<Option<Instance>>>,
}

impl InjectionMeta {
    /// Whether both metas belong to the same stored binding
    #[inline]
    #[must_use]
    pub fn same_binding(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.instance, &other.instance)
    }
}

impl Debug for InjectionMeta {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("InjectionMeta")
            .field("kind", &self.kind)
            .field("cross_context", &self.cross_context)
            .field("supply", &self.supply)
            .field("cached", &self.instance.lock().is_some())
            .finish()
    }
}

pub type InjectionBinding = Binding<InjectionValue, InjectionMeta>;

impl Binding<InjectionValue, InjectionMeta> {
    #[inline]
    #[must_use]
    pub const fn kind(&self) -> InjectionKind {
        self.meta.kind
    }

    #[inline]
    #[must_use]
    pub const fn is_cross_context(&self) -> bool {
        self.meta.cross_context
    }

    /// Consumers that receive this binding's value regardless of their own bindings
    #[inline]
    #[must_use]
    pub fn supply_list(&self) -> &[TypeInfo] {
        &self.meta.supply
    }

    #[inline]
    #[must_use]
    pub fn value_type(&self) -> Option<TypeInfo> {
        self.value().map(InjectionValue::type_info)
    }

    /// Instance of a [`InjectionKind::Value`] binding or a created singleton
    #[must_use]
    pub fn instance<V: ?Sized + Send + Sync + 'static>(&self) -> Option<Arc<V>> {
        match self.value() {
            Some(InjectionValue::Instance(value)) => value.downcast(),
            _ => self.meta.instance.lock().as_ref().and_then(|instance| instance.downcast_ref::<Arc<V>>().cloned()),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{InjectionBinding, InjectionKind, InjectionMeta, InjectionValue, ValueInstance};
    use crate::{any::TypeInfo, key::Key};

    use alloc::sync::Arc;

    trait Named: Send + Sync {}
    struct Zaphod;
    impl Named for Zaphod {}

    #[test]
    fn test_value_instance_identity() {
        let value = Arc::new(42i32);
        let first = ValueInstance::new(value.clone());
        let second = ValueInstance::new(value.clone());

        assert_eq!(first, second);
        assert_ne!(first, ValueInstance::new(Arc::new(42i32)));
        assert!(Arc::ptr_eq(&first.downcast::<i32>().unwrap(), &value));
        assert!(first.downcast::<u32>().is_none());
    }

    #[test]
    fn test_value_instance_unsized() {
        let value: Arc<dyn Named> = Arc::new(Zaphod);
        let instance = ValueInstance::new(value);

        assert_eq!(instance.type_info(), TypeInfo::of::<dyn Named>());
        assert!(instance.downcast::<dyn Named>().is_some());
    }

    #[test]
    fn test_binding_accessors() {
        let mut binding = InjectionBinding::with_meta(Key::of::<i32>(), InjectionMeta::default());
        assert_eq!(binding.kind(), InjectionKind::Default);
        assert!(binding.instance::<i32>().is_none());

        let value = Arc::new(7i32);
        binding.push_value(InjectionValue::Instance(ValueInstance::new(value.clone())));
        binding.meta.kind = InjectionKind::Value;

        assert_eq!(binding.value_type(), Some(TypeInfo::of::<i32>()));
        assert!(Arc::ptr_eq(&binding.instance::<i32>().unwrap(), &value));
        assert!(binding.meta().same_binding(&binding.clone().meta));
        assert!(!binding.meta().same_binding(&InjectionMeta::default()));
    }
}
