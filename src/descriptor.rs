use alloc::{boxed::Box, collections::BTreeMap, sync::Arc, vec::Vec};
use core::any::Any;

use crate::{
    any::TypeInfo,
    dependency::Dependency,
    errors::{InjectionErrorKind, InstantiateErrorKind},
    injection_binding::Instance,
    key::Key,
    service::{service_fn, BoxCloneService},
};

pub(crate) type ErasedObject = Box<dyn Any + Send + Sync>;
pub(crate) type Caster = Arc<dyn Fn(&Instance) -> Option<Instance> + Send + Sync>;
pub(crate) type ConstructService = BoxCloneService<Vec<Instance>, ErasedObject, InjectionErrorKind>;

type ConstructFn<T> = Arc<dyn Fn(&[Instance]) -> Result<T, InjectionErrorKind> + Send + Sync>;
type SetFn<T> = Arc<dyn Fn(&mut T, &Instance) -> Result<(), InjectionErrorKind> + Send + Sync>;
type PostConstructFn<T> = Arc<dyn Fn(&mut T) + Send + Sync>;
pub(crate) type ErasedSetFn = Arc<dyn Fn(&mut (dyn Any + Send + Sync), &Instance) -> Result<(), InjectionErrorKind> + Send + Sync>;
pub(crate) type ErasedPostConstructFn = Arc<dyn Fn(&mut (dyn Any + Send + Sync)) + Send + Sync>;

/// Type that can be constructed and populated by an [`crate::InjectionBinder`].
///
/// # Examples
/// ```rust
/// use std::sync::Arc;
/// use bindery::{Descriptor, Injectable, InstantiateErrorKind};
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// struct Config {
///     name: String,
/// }
///
/// struct ConsoleGreeter {
///     config: Arc<Config>,
///     prefix: Option<Arc<String>>,
///     greetings: u8,
/// }
///
/// impl ConsoleGreeter {
///     fn new(config: Arc<Config>) -> Result<Self, InstantiateErrorKind> {
///         Ok(Self { config, prefix: None, greetings: 0 })
///     }
/// }
///
/// impl Greeter for ConsoleGreeter {
///     fn greet(&self) -> String {
///         format!("{}{}", self.prefix.as_deref().map_or("", String::as_str), self.config.name)
///     }
/// }
///
/// impl Injectable for ConsoleGreeter {
///     fn describe(class: &mut Descriptor<Self>) {
///         class.constructor(Self::new);
///         class
///             .setter("prefix", |this: &mut Self, prefix: Arc<String>| this.prefix = Some(prefix))
///             .named("prefix");
///         class.post_construct("ready", |this: &mut Self| this.greetings += 1);
///         class.implements::<dyn Greeter>(|this| this);
///     }
/// }
/// ```
pub trait Injectable: Sized + Send + Sync + 'static {
    fn describe(class: &mut Descriptor<Self>);
}

/// Function usable as a constructor: takes `Arc<D>` for each dependency `D`
pub trait Constructor<Args, T>: Send + Sync + 'static {
    fn parameters() -> Vec<TypeInfo>;

    /// # Errors
    /// Returns [`InjectionErrorKind::Instantiate`] if the constructor fails
    fn construct(&self, args: &[Instance]) -> Result<T, InjectionErrorKind>;
}

fn argument<D: ?Sized + Send + Sync + 'static>(arg: Option<&Instance>) -> Result<Arc<D>, InjectionErrorKind> {
    let type_info = TypeInfo::of::<D>();
    let Some(arg) = arg else {
        return Err(InjectionErrorKind::NullBinding { type_info, name: None });
    };
    arg.downcast_ref::<Arc<D>>()
        .cloned()
        .ok_or(InjectionErrorKind::IllegalBindingValue {
            type_info,
            value: TypeInfo::of::<Instance>(),
        })
}

macro_rules! impl_constructor {
    (
        [$($ty:ident),*]
    ) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, T, $($ty,)*> Constructor<($(Arc<$ty>,)*), T> for F
        where
            F: Fn($(Arc<$ty>,)*) -> Result<T, InstantiateErrorKind> + Send + Sync + 'static,
            T: 'static,
            $( $ty: ?Sized + Send + Sync + 'static, )*
        {
            fn parameters() -> Vec<TypeInfo> {
                alloc::vec![$(TypeInfo::of::<$ty>(),)*]
            }

            fn construct(&self, args: &[Instance]) -> Result<T, InjectionErrorKind> {
                let mut args = args.iter();
                $(
                    let $ty = argument::<$ty>(args.next())?;
                )*
                (self)($($ty,)*).map_err(|source| InjectionErrorKind::Instantiate {
                    type_info: TypeInfo::of::<T>(),
                    source,
                })
            }
        }
    };
}

all_the_tuples!(impl_constructor);

/// Visibility of an injectable member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    #[default]
    Public,
    NonPublic,
}

pub struct ConstructorDescriptor<T> {
    params: Vec<Dependency>,
    tagged: bool,
    construct: ConstructFn<T>,
}

impl<T> ConstructorDescriptor<T> {
    /// Marks the constructor as the one to use for injection
    #[inline]
    pub fn tagged(&mut self) -> &mut Self {
        self.tagged = true;
        self
    }

    /// Resolves the parameter at `index` from the binding with the name.
    /// Indexes past the last parameter are ignored.
    #[inline]
    pub fn name_param(&mut self, index: usize, name: impl Into<Key>) -> &mut Self {
        if let Some(param) = self.params.get_mut(index) {
            param.name = Some(name.into());
        }
        self
    }
}

pub struct SetterDescriptor<T> {
    member: &'static str,
    dependency: Dependency,
    visibility: Visibility,
    inject: SetFn<T>,
}

impl<T> SetterDescriptor<T> {
    #[inline]
    pub fn named(&mut self, name: impl Into<Key>) -> &mut Self {
        self.dependency.name = Some(name.into());
        self
    }

    #[inline]
    pub fn non_public(&mut self) -> &mut Self {
        self.visibility = Visibility::NonPublic;
        self
    }

    fn project<D: 'static>(self, project: fn(&mut D) -> &mut T) -> SetterDescriptor<D>
    where
        T: 'static,
    {
        let inject = self.inject;
        SetterDescriptor {
            member: self.member,
            dependency: self.dependency,
            visibility: self.visibility,
            inject: Arc::new(move |this: &mut D, value: &Instance| inject(project(this), value)),
        }
    }
}

pub struct PostConstructDescriptor<T> {
    name: &'static str,
    order: i32,
    invoke: PostConstructFn<T>,
}

impl<T> PostConstructDescriptor<T> {
    /// Hooks run in ascending order, hooks with equal order run in declaration order
    #[inline]
    pub fn order(&mut self, order: i32) -> &mut Self {
        self.order = order;
        self
    }

    fn project<D: 'static>(self, project: fn(&mut D) -> &mut T) -> PostConstructDescriptor<D>
    where
        T: 'static,
    {
        let invoke = self.invoke;
        PostConstructDescriptor {
            name: self.name,
            order: self.order,
            invoke: Arc::new(move |this: &mut D| invoke(project(this))),
        }
    }
}

/// Marks a type for [`crate::InjectionBinder::scan`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ImplicitDescriptor {
    pub(crate) cross_context: bool,
}

impl ImplicitDescriptor {
    #[inline]
    pub fn cross_context(&mut self) -> &mut Self {
        self.cross_context = true;
        self
    }
}

/// Shape of an injectable type: constructors, setters, post-construct hooks and casts
pub struct Descriptor<T> {
    constructors: Vec<ConstructorDescriptor<T>>,
    setters: Vec<SetterDescriptor<T>>,
    post_constructs: Vec<PostConstructDescriptor<T>>,
    implements: Vec<(TypeInfo, Caster)>,
    implicit: Option<ImplicitDescriptor>,
}

impl<T: Send + Sync + 'static> Descriptor<T> {
    #[inline]
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            constructors: Vec::new(),
            setters: Vec::new(),
            post_constructs: Vec::new(),
            implements: Vec::new(),
            implicit: None,
        }
    }

    /// Declares a constructor.
    /// A type without constructors is abstract and can't be instantiated.
    pub fn constructor<Args, F>(&mut self, constructor: F) -> &mut ConstructorDescriptor<T>
    where
        F: Constructor<Args, T>,
    {
        let params = F::parameters()
            .into_iter()
            .map(|type_info| Dependency { type_info, name: None })
            .collect();
        let index = self.constructors.len();
        self.constructors.push(ConstructorDescriptor {
            params,
            tagged: false,
            construct: Arc::new(move |args: &[Instance]| constructor.construct(args)),
        });
        &mut self.constructors[index]
    }

    /// Declares an injectable member.
    /// Declaring a member with the same name again replaces the previous declaration, including inherited ones.
    pub fn setter<D, F>(&mut self, member: &'static str, set: F) -> &mut SetterDescriptor<T>
    where
        D: ?Sized + Send + Sync + 'static,
        F: Fn(&mut T, Arc<D>) + Send + Sync + 'static,
    {
        let setter = SetterDescriptor {
            member,
            dependency: Dependency::of::<D>(),
            visibility: Visibility::Public,
            inject: Arc::new(move |this: &mut T, value: &Instance| -> Result<(), InjectionErrorKind> {
                set(this, argument::<D>(Some(value))?);
                Ok(())
            }),
        };

        let index = if let Some(index) = self.setters.iter().position(|own| own.member == member) {
            self.setters[index] = setter;
            index
        } else {
            self.setters.push(setter);
            self.setters.len() - 1
        };
        &mut self.setters[index]
    }

    /// Declares a hook called after all members are injected.
    /// Declaring a hook with the same name again replaces the previous declaration.
    pub fn post_construct<F>(&mut self, name: &'static str, hook: F) -> &mut PostConstructDescriptor<T>
    where
        F: Fn(&mut T) + Send + Sync + 'static,
    {
        let post_construct = PostConstructDescriptor {
            name,
            order: 0,
            invoke: Arc::new(hook),
        };

        let index = if let Some(index) = self.post_constructs.iter().position(|own| own.name == name) {
            self.post_constructs[index] = post_construct;
            index
        } else {
            self.post_constructs.push(post_construct);
            self.post_constructs.len() - 1
        };
        &mut self.post_constructs[index]
    }

    /// Declares that the type can be bound to `K`, usually a trait object.
    /// The cast is mostly an unsizing coercion: `class.implements::<dyn Trait>(|this| this)`.
    pub fn implements<K>(&mut self, upcast: fn(Arc<T>) -> Arc<K>) -> &mut Self
    where
        K: ?Sized + Send + Sync + 'static,
    {
        let caster: Caster = Arc::new(move |instance: &Instance| {
            instance
                .downcast_ref::<Arc<T>>()
                .map(|this| Arc::new(upcast(this.clone())) as Instance)
        });
        self.implements.push((TypeInfo::of::<K>(), caster));
        self
    }

    /// Inherits members and post-construct hooks of the base type embedded in this one.
    /// Members redeclared by this type replace the inherited ones.
    pub fn extend<B: Injectable>(&mut self, project: fn(&mut T) -> &mut B) -> &mut Self {
        let mut base = Descriptor::<B>::new();
        B::describe(&mut base);

        let setters: Vec<_> = base
            .setters
            .into_iter()
            .filter(|inherited| !self.setters.iter().any(|own| own.member == inherited.member))
            .map(|inherited| inherited.project(project))
            .collect();
        self.setters.splice(0..0, setters);

        let post_constructs: Vec<_> = base
            .post_constructs
            .into_iter()
            .filter(|inherited| !self.post_constructs.iter().any(|own| own.name == inherited.name))
            .map(|inherited| inherited.project(project))
            .collect();
        self.post_constructs.splice(0..0, post_constructs);

        self
    }

    /// Marks the type to be bound by [`crate::InjectionBinder::scan`] as a weak singleton
    /// under each of its [`Self::implements`] keys (or itself, if there are none)
    pub fn implicit_binding(&mut self) -> &mut ImplicitDescriptor {
        self.implicit.get_or_insert_with(ImplicitDescriptor::default)
    }
}

pub(crate) struct RawConstructor {
    pub(crate) params: Vec<Dependency>,
    pub(crate) tagged: bool,
    pub(crate) invoke: ConstructService,
}

pub(crate) struct RawSetter {
    pub(crate) member: &'static str,
    pub(crate) dependency: Dependency,
    pub(crate) visibility: Visibility,
    pub(crate) inject: ErasedSetFn,
}

pub(crate) struct RawPostConstruct {
    pub(crate) name: &'static str,
    pub(crate) order: i32,
    pub(crate) invoke: ErasedPostConstructFn,
}

/// Type-erased, not yet validated [`Descriptor`]
pub(crate) struct RawClass {
    pub(crate) type_info: TypeInfo,
    pub(crate) constructors: Vec<RawConstructor>,
    pub(crate) setters: Vec<RawSetter>,
    pub(crate) post_constructs: Vec<RawPostConstruct>,
    pub(crate) implements: BTreeMap<TypeInfo, Caster>,
    pub(crate) implicit: Option<ImplicitDescriptor>,
    pub(crate) into_instance: fn(ErasedObject) -> Option<Instance>,
}

fn into_instance<T: Send + Sync + 'static>(object: ErasedObject) -> Option<Instance> {
    object
        .downcast::<T>()
        .ok()
        .map(|this| Arc::new(Arc::<T>::from(this)) as Instance)
}

pub(crate) fn erase<T: Injectable>() -> RawClass {
    let mut class = Descriptor::<T>::new();
    T::describe(&mut class);
    let type_info = TypeInfo::of::<T>();

    let constructors = class
        .constructors
        .into_iter()
        .map(|ConstructorDescriptor { params, tagged, construct }| RawConstructor {
            params,
            tagged,
            invoke: BoxCloneService::new(service_fn(move |args: Vec<Instance>| {
                construct(&args).map(|object| Box::new(object) as ErasedObject)
            })),
        })
        .collect();

    let setters = class
        .setters
        .into_iter()
        .map(
            |SetterDescriptor {
                 member,
                 dependency,
                 visibility,
                 inject,
             }| RawSetter {
                member,
                dependency,
                visibility,
                inject: Arc::new(move |object: &mut (dyn Any + Send + Sync), value: &Instance| {
                    match object.downcast_mut::<T>() {
                        Some(this) => inject(this, value),
                        None => Err(InjectionErrorKind::IllegalBindingValue { type_info, value: type_info }),
                    }
                }),
            },
        )
        .collect();

    let post_constructs = class
        .post_constructs
        .into_iter()
        .map(|PostConstructDescriptor { name, order, invoke }| RawPostConstruct {
            name,
            order,
            invoke: Arc::new(move |object: &mut (dyn Any + Send + Sync)| {
                if let Some(this) = object.downcast_mut::<T>() {
                    invoke(this);
                }
            }),
        })
        .collect();

    RawClass {
        type_info,
        constructors,
        setters,
        post_constructs,
        implements: class.implements.into_iter().collect(),
        implicit: class.implicit,
        into_instance: into_instance::<T>,
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::{erase, Descriptor, Injectable, Visibility};
    use crate::{
        any::TypeInfo,
        errors::{InjectionErrorKind, InstantiateErrorKind},
        injection_binding::Instance,
        key::Key,
        service::Service as _,
    };

    use alloc::{sync::Arc, vec, vec::Vec};
    use core::any::Any;

    trait Shape: Send + Sync {
        fn sides(&self) -> u8;
    }

    struct Base {
        label: Option<Arc<&'static str>>,
        initialized: bool,
    }

    impl Injectable for Base {
        fn describe(class: &mut Descriptor<Self>) {
            class.setter("label", |this: &mut Self, label: Arc<&'static str>| this.label = Some(label));
            class.setter("count", |_: &mut Self, _: Arc<u8>| {});
            class.post_construct("init", |this: &mut Self| this.initialized = true);
        }
    }

    struct Square {
        base: Base,
        side: Arc<u8>,
        count: Option<Arc<u8>>,
    }

    impl Square {
        fn new(side: Arc<u8>) -> Result<Self, InstantiateErrorKind> {
            Ok(Self {
                base: Base {
                    label: None,
                    initialized: false,
                },
                side,
                count: None,
            })
        }
    }

    impl Shape for Square {
        fn sides(&self) -> u8 {
            4
        }
    }

    impl Injectable for Square {
        fn describe(class: &mut Descriptor<Self>) {
            class.constructor(Self::new).tagged().name_param(0, "side");
            class.extend::<Base>(|this| &mut this.base);
            class
                .setter("count", |this: &mut Self, count: Arc<u8>| this.count = Some(count))
                .named("count");
            class.implements::<dyn Shape>(|this| this);
        }
    }

    #[test]
    fn test_erase_constructors() {
        let class = erase::<Square>();

        assert_eq!(class.type_info, TypeInfo::of::<Square>());
        assert_eq!(class.constructors.len(), 1);
        let constructor = &class.constructors[0];
        assert!(constructor.tagged);
        assert_eq!(constructor.params.len(), 1);
        assert_eq!(constructor.params[0].type_info, TypeInfo::of::<u8>());
        assert_eq!(constructor.params[0].name, Some(Key::from("side")));

        let side: Instance = Arc::new(Arc::new(3u8));
        let object = constructor.invoke.clone().call(vec![side]).unwrap();
        let square = object.downcast::<Square>().unwrap();
        assert_eq!(*square.side, 3);
    }

    #[test]
    fn test_constructor_missing_argument() {
        let class = erase::<Square>();
        let err = class.constructors[0].invoke.clone().call(Vec::new()).err().unwrap();

        assert!(matches!(err, InjectionErrorKind::NullBinding { .. }));
    }

    #[test]
    fn test_extend_keeps_order_and_overrides() {
        let class = erase::<Square>();

        let members: Vec<_> = class.setters.iter().map(|setter| setter.member).collect();
        assert_eq!(members, ["label", "count"]);
        assert_eq!(class.setters[1].dependency.name, Some(Key::from("count")));
        assert!(class.setters.iter().all(|setter| setter.visibility == Visibility::Public));
        assert_eq!(class.post_constructs.len(), 1);

        let mut object: alloc::boxed::Box<dyn Any + Send + Sync> =
            alloc::boxed::Box::new(Square::new(Arc::new(1)).unwrap());
        let label: Instance = Arc::new(Arc::new("square"));
        let count: Instance = Arc::new(Arc::new(2u8));
        (class.setters[0].inject)(object.as_mut(), &label).unwrap();
        (class.setters[1].inject)(object.as_mut(), &count).unwrap();
        (class.post_constructs[0].invoke)(object.as_mut());

        let square = object.downcast::<Square>().unwrap();
        assert_eq!(square.base.label.as_deref(), Some(&"square"));
        assert_eq!(square.count.as_deref(), Some(&2));
        assert!(square.base.initialized);
    }

    #[test]
    fn test_implements_cast() {
        let class = erase::<Square>();
        let caster = class.implements.get(&TypeInfo::of::<dyn Shape>()).unwrap();

        let object = (class.into_instance)(alloc::boxed::Box::new(Square::new(Arc::new(1)).unwrap())).unwrap();
        let shape = caster(&object).unwrap();
        assert_eq!(shape.downcast_ref::<Arc<dyn Shape>>().unwrap().sides(), 4);

        let wrong: Instance = Arc::new(Arc::new(1u8));
        assert!(caster(&wrong).is_none());
    }
}
