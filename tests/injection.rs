use bindery::{Descriptor, Injectable, InjectionBinder, InjectionErrorKind, InjectionKind, InstantiateErrorKind, TypeInfo};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc, Mutex,
};

trait SimpleInterface: Send + Sync {
    fn name(&self) -> &'static str;
}

struct SimpleInterfaceImplementer;

impl SimpleInterface for SimpleInterfaceImplementer {
    fn name(&self) -> &'static str {
        "SimpleInterfaceImplementer"
    }
}

impl Injectable for SimpleInterfaceImplementer {
    fn describe(class: &mut Descriptor<Self>) {
        class.constructor(|| Ok(Self));
        class.implements::<dyn SimpleInterface>(|this| this);
    }
}

struct PolymorphicClass;

impl SimpleInterface for PolymorphicClass {
    fn name(&self) -> &'static str {
        "PolymorphicClass"
    }
}

impl Injectable for PolymorphicClass {
    fn describe(class: &mut Descriptor<Self>) {
        class.constructor(|| Ok(Self));
        class.implements::<dyn SimpleInterface>(|this| this);
    }
}

#[derive(Default)]
struct Model {
    counter: AtomicU32,
}

impl Injectable for Model {
    fn describe(class: &mut Descriptor<Self>) {
        class.constructor(|| Ok(Self::default()));
    }
}

struct Config {
    source: &'static str,
}

struct ConfigConsumer {
    by_constructor: Arc<Config>,
    by_setter: Option<Arc<Config>>,
}

impl ConfigConsumer {
    fn new(by_constructor: Arc<Config>) -> Result<Self, InstantiateErrorKind> {
        Ok(Self {
            by_constructor,
            by_setter: None,
        })
    }
}

impl Injectable for ConfigConsumer {
    fn describe(class: &mut Descriptor<Self>) {
        class.constructor(Self::new);
        class.setter("config", |this: &mut Self, config: Arc<Config>| this.by_setter = Some(config));
    }
}

struct OtherConsumer {
    config: Arc<Config>,
}

impl Injectable for OtherConsumer {
    fn describe(class: &mut Descriptor<Self>) {
        class.constructor(|config: Arc<Config>| Ok(Self { config }));
    }
}

struct CircularA {
    _b: Arc<CircularB>,
}

impl Injectable for CircularA {
    fn describe(class: &mut Descriptor<Self>) {
        class.constructor(|b: Arc<CircularB>| Ok(Self { _b: b }));
    }
}

struct CircularB {
    _a: Option<Arc<CircularA>>,
}

impl Injectable for CircularB {
    fn describe(class: &mut Descriptor<Self>) {
        class.constructor(|| Ok(Self { _a: None }));
        class.setter("a", |this: &mut Self, a: Arc<CircularA>| this._a = Some(a));
    }
}

struct Lifecycle {
    calls: Mutex<Vec<&'static str>>,
    constructed_with: usize,
}

impl Lifecycle {
    fn empty() -> Result<Self, InstantiateErrorKind> {
        Ok(Self {
            calls: Mutex::new(Vec::new()),
            constructed_with: 0,
        })
    }

    fn with_model(_: Arc<Model>) -> Result<Self, InstantiateErrorKind> {
        Ok(Self {
            calls: Mutex::new(Vec::new()),
            constructed_with: 1,
        })
    }

    fn with_model_and_config(_: Arc<Model>, _: Arc<Config>) -> Result<Self, InstantiateErrorKind> {
        Ok(Self {
            calls: Mutex::new(Vec::new()),
            constructed_with: 2,
        })
    }

    fn record(&mut self, call: &'static str) {
        self.calls.get_mut().unwrap().push(call);
    }
}

impl Injectable for Lifecycle {
    fn describe(class: &mut Descriptor<Self>) {
        class.constructor(Self::empty);
        class.constructor(Self::with_model_and_config);
        class.constructor(Self::with_model);
        class.post_construct("last", |this: &mut Self| this.record("last")).order(2);
        class.post_construct("first", |this: &mut Self| this.record("first")).order(1);
    }
}

#[test]
fn test_binding_replacement_law() {
    let binder = InjectionBinder::new();
    binder.bind::<dyn SimpleInterface>().to::<SimpleInterfaceImplementer>().finish().unwrap();
    let err = binder.bind::<dyn SimpleInterface>().to::<PolymorphicClass>().finish().unwrap_err();
    assert!(matches!(err, InjectionErrorKind::Binder(_)));

    let binder = InjectionBinder::new();
    binder
        .bind::<dyn SimpleInterface>()
        .to::<SimpleInterfaceImplementer>()
        .weak()
        .finish()
        .unwrap();
    binder.bind::<dyn SimpleInterface>().to::<PolymorphicClass>().finish().unwrap();

    let binding = binder.get_binding::<dyn SimpleInterface>().unwrap();
    assert_eq!(binding.value_type(), Some(TypeInfo::of::<PolymorphicClass>()));
    assert_eq!(binder.get_instance::<dyn SimpleInterface>().unwrap().name(), "PolymorphicClass");
}

#[test]
fn test_value_immutability() {
    let binder = InjectionBinder::new();
    let first = Arc::new(Model::default());
    let second = Arc::new(Config { source: "value" });

    let binding = binder.bind::<Model>().to_value(first.clone()).to_singleton().finish().unwrap();
    assert_eq!(binding.kind(), InjectionKind::Value);
    let binding = binder.bind::<Config>().to_singleton().to_value(second.clone()).finish().unwrap();
    assert_eq!(binding.kind(), InjectionKind::Value);

    for _ in 0..2 {
        assert!(Arc::ptr_eq(&binder.get_instance::<Model>().unwrap(), &first));
        assert!(Arc::ptr_eq(&binder.get_instance::<Config>().unwrap(), &second));
    }
}

#[test]
fn test_singleton_idempotence() {
    let binder = InjectionBinder::new();
    binder.bind::<Model>().to::<Model>().to_singleton().finish().unwrap();

    let first = binder.get_instance::<Model>().unwrap();
    let second = binder.get_instance::<Model>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    first.counter.fetch_add(1, Ordering::SeqCst);
    assert_eq!(second.counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_default_non_idempotence() {
    let binder = InjectionBinder::new();
    binder.bind::<Model>().to::<Model>().finish().unwrap();

    let first = binder.get_instance::<Model>().unwrap();
    let second = binder.get_instance::<Model>().unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
}

#[test]
fn test_supply_precedence() {
    let binder = InjectionBinder::new();
    binder
        .bind::<Config>()
        .to_value(Arc::new(Config { source: "supplied" }))
        .supply_to::<ConfigConsumer>()
        .finish()
        .unwrap();
    binder.bind::<Config>().to_value(Arc::new(Config { source: "bound" })).finish().unwrap();
    binder.bind::<ConfigConsumer>().to::<ConfigConsumer>().finish().unwrap();
    binder.bind::<OtherConsumer>().to::<OtherConsumer>().finish().unwrap();

    let consumer = binder.get_instance::<ConfigConsumer>().unwrap();
    assert_eq!(consumer.by_constructor.source, "supplied");
    assert_eq!(consumer.by_setter.as_ref().unwrap().source, "supplied");

    assert_eq!(binder.get_instance::<OtherConsumer>().unwrap().config.source, "bound");
    assert_eq!(binder.get_instance::<Config>().unwrap().source, "bound");
}

#[test]
fn test_supply_after_plain_binding() {
    let binder = InjectionBinder::new();
    binder.bind::<Config>().to_value(Arc::new(Config { source: "bound" })).finish().unwrap();
    let supplier = binder
        .bind::<Config>()
        .to_value(Arc::new(Config { source: "supplied" }))
        .supply_to::<ConfigConsumer>()
        .finish()
        .unwrap();
    binder.bind::<ConfigConsumer>().to::<ConfigConsumer>().finish().unwrap();

    assert_eq!(binder.get_instance::<ConfigConsumer>().unwrap().by_constructor.source, "supplied");
    assert_eq!(binder.get_instance::<Config>().unwrap().source, "bound");

    assert!(binder.unbind_binding(&supplier));
    assert!(binder.get_supplier::<Config, ConfigConsumer>().is_none());
    assert_eq!(binder.get_instance::<ConfigConsumer>().unwrap().by_constructor.source, "bound");
}

#[test]
fn test_cycle_detection() {
    let binder = InjectionBinder::new();
    binder.bind::<CircularA>().to::<CircularA>().finish().unwrap();
    binder.bind::<CircularB>().to::<CircularB>().finish().unwrap();

    let err = binder.get_instance::<CircularA>().err().unwrap();
    let InjectionErrorKind::CircularDependency { path } = &err else {
        panic!("unexpected error: {err}");
    };
    assert_eq!(
        path.as_ref(),
        [
            TypeInfo::of::<CircularA>(),
            TypeInfo::of::<CircularB>(),
            TypeInfo::of::<CircularA>()
        ]
    );
    assert_eq!(err.to_string(), "Circular dependency detected: CircularA -> CircularB -> CircularA");

    binder.unbind::<CircularB>().unwrap();
    binder.bind::<CircularB>().to_value(Arc::new(CircularB { _a: None })).finish().unwrap();
    assert!(binder.get_instance::<CircularA>().is_ok());
}

#[test]
fn test_singleton_setter_cycle() {
    let binder = InjectionBinder::new();
    binder.bind::<CircularA>().to::<CircularA>().to_singleton().finish().unwrap();
    binder.bind::<CircularB>().to::<CircularB>().to_singleton().finish().unwrap();

    let err = binder.get_instance::<CircularB>().err().unwrap();
    assert!(matches!(err, InjectionErrorKind::CircularDependency { .. }));
    assert!(binder.get_binding::<CircularA>().unwrap().instance::<CircularA>().is_none());
    assert!(binder.get_binding::<CircularB>().unwrap().instance::<CircularB>().is_none());
}

#[test]
fn test_get_injectable_binds_implicitly() {
    let binder = InjectionBinder::new();
    assert!(matches!(
        binder.get_instance::<Model>().err().unwrap(),
        InjectionErrorKind::NullBinding { .. }
    ));

    let model = binder.get_injectable::<Model>().unwrap();
    assert_eq!(model.counter.load(Ordering::SeqCst), 0);
    assert!(binder.get_binding::<Model>().unwrap().is_weak());
    assert!(binder.get_instance::<Model>().is_ok());
}

#[test]
fn test_failed_resolution_keeps_state() {
    let binder = InjectionBinder::new();
    binder.bind::<Model>().to::<Model>().to_singleton().finish().unwrap();
    binder.bind::<ConfigConsumer>().to::<ConfigConsumer>().finish().unwrap();

    let model = binder.get_instance::<Model>().unwrap();
    assert!(matches!(
        binder.get_instance::<ConfigConsumer>().err().unwrap(),
        InjectionErrorKind::NullBinding { .. }
    ));

    assert!(Arc::ptr_eq(&binder.get_instance::<Model>().unwrap(), &model));
    assert!(binder.get_binding::<ConfigConsumer>().is_some());
}

#[test]
fn test_reflection_caching() {
    let binder = InjectionBinder::new();
    let reflector = binder.reflector();

    let first = reflector.get::<ConfigConsumer>().unwrap();
    let second = reflector.get::<ConfigConsumer>().unwrap();

    assert!(!first.is_pre_generated());
    assert!(second.is_pre_generated());
    assert_eq!(first.constructor_params(), second.constructor_params());
    assert_eq!(
        first.setters().iter().map(|setter| setter.member()).collect::<Vec<_>>(),
        second.setters().iter().map(|setter| setter.member()).collect::<Vec<_>>()
    );
    assert_eq!(
        first.post_constructs().collect::<Vec<_>>(),
        second.post_constructs().collect::<Vec<_>>()
    );
}

#[test]
fn test_named_instance_before_unnamed_instance() {
    let binder = InjectionBinder::new();
    binder
        .bind::<dyn SimpleInterface>()
        .to::<PolymorphicClass>()
        .to_name("ONE")
        .finish()
        .unwrap();
    binder.bind::<dyn SimpleInterface>().to::<SimpleInterfaceImplementer>().finish().unwrap();

    assert_eq!(binder.get_instance::<dyn SimpleInterface>().unwrap().name(), "SimpleInterfaceImplementer");
    assert_eq!(binder.get_named_instance::<dyn SimpleInterface>("ONE").unwrap().name(), "PolymorphicClass");
}

#[test]
fn test_unnamed_instance_before_named_instance() {
    let binder = InjectionBinder::new();
    binder.bind::<dyn SimpleInterface>().to::<SimpleInterfaceImplementer>().finish().unwrap();
    binder
        .bind::<dyn SimpleInterface>()
        .to::<PolymorphicClass>()
        .to_name("ONE")
        .finish()
        .unwrap();

    assert_eq!(binder.get_instance::<dyn SimpleInterface>().unwrap().name(), "SimpleInterfaceImplementer");
    assert_eq!(binder.get_named_instance::<dyn SimpleInterface>("ONE").unwrap().name(), "PolymorphicClass");
}

#[test]
fn test_cross_context_singleton() {
    let parent = InjectionBinder::new();
    parent.bind::<Model>().to::<Model>().to_singleton().cross_context().finish().unwrap();

    let first_child = parent.child();
    let second_child = parent.child();

    let first = first_child.get_instance::<Model>().unwrap();
    let second = second_child.get_instance::<Model>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    first.counter.fetch_add(1, Ordering::SeqCst);
    assert_eq!(second.counter.load(Ordering::SeqCst), 1);
    assert_eq!(parent.get_instance::<Model>().unwrap().counter.load(Ordering::SeqCst), 1);
}

#[test]
fn test_cross_context_dependencies_resolved_by_requesting_binder() {
    let parent = InjectionBinder::new();
    parent.bind::<OtherConsumer>().to::<OtherConsumer>().cross_context().finish().unwrap();

    let child = parent.child();
    child.bind::<Config>().to_value(Arc::new(Config { source: "child" })).finish().unwrap();

    assert_eq!(child.get_instance::<OtherConsumer>().unwrap().config.source, "child");
    assert!(matches!(
        parent.get_instance::<OtherConsumer>().err().unwrap(),
        InjectionErrorKind::NullBinding { .. }
    ));
}

#[test]
fn test_shortest_constructor_and_post_construct_order() {
    let binder = InjectionBinder::new();
    binder.bind::<Model>().to::<Model>().finish().unwrap();
    binder.bind::<Lifecycle>().to::<Lifecycle>().finish().unwrap();

    let lifecycle = binder.get_instance::<Lifecycle>().unwrap();
    assert_eq!(lifecycle.constructed_with, 1);
    assert_eq!(*lifecycle.calls.lock().unwrap(), ["first", "last"]);
}

#[test]
fn test_polymorphic_keys() {
    let binder = InjectionBinder::new();
    binder
        .bind::<dyn SimpleInterface>()
        .bind::<PolymorphicClass>()
        .to::<PolymorphicClass>()
        .to_singleton()
        .finish()
        .unwrap();

    let by_interface = binder.get_instance::<dyn SimpleInterface>().unwrap();
    let by_class = binder.get_instance::<PolymorphicClass>().unwrap();
    assert!(std::ptr::addr_eq(Arc::as_ptr(&by_interface), Arc::as_ptr(&by_class)));
}
