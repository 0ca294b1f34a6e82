#![allow(dead_code)]

use bindery::{Descriptor, Injectable, InjectionBinder};
use criterion::{criterion_group, criterion_main, Criterion};
use std::sync::Arc;

struct A(Arc<B>, Arc<C>);
struct B(i32);
struct C(Arc<CA>);
struct CA(Arc<CAA>);
struct CAA(Arc<CAAA>);
struct CAAA(Arc<CAAAA>);
struct CAAAA(Arc<CAAAAA>);
struct CAAAAA;

impl Injectable for A {
    fn describe(class: &mut Descriptor<Self>) {
        class.constructor(|b: Arc<B>, c: Arc<C>| Ok(A(b, c)));
    }
}

impl Injectable for B {
    fn describe(class: &mut Descriptor<Self>) {
        class.constructor(|| Ok(B(2)));
    }
}

impl Injectable for C {
    fn describe(class: &mut Descriptor<Self>) {
        class.constructor(|ca: Arc<CA>| Ok(C(ca)));
    }
}

impl Injectable for CA {
    fn describe(class: &mut Descriptor<Self>) {
        class.constructor(|caa: Arc<CAA>| Ok(CA(caa)));
    }
}

impl Injectable for CAA {
    fn describe(class: &mut Descriptor<Self>) {
        class.constructor(|caaa: Arc<CAAA>| Ok(CAA(caaa)));
    }
}

impl Injectable for CAAA {
    fn describe(class: &mut Descriptor<Self>) {
        class.constructor(|caaaa: Arc<CAAAA>| Ok(CAAA(caaaa)));
    }
}

impl Injectable for CAAAA {
    fn describe(class: &mut Descriptor<Self>) {
        class.constructor(|caaaaa: Arc<CAAAAA>| Ok(CAAAA(caaaaa)));
    }
}

impl Injectable for CAAAAA {
    fn describe(class: &mut Descriptor<Self>) {
        class.constructor(|| Ok(CAAAAA));
    }
}

#[inline]
fn binder_with_chain() -> InjectionBinder {
    let binder = InjectionBinder::new();
    binder.bind::<A>().to::<A>().finish().unwrap();
    binder.bind::<B>().to::<B>().finish().unwrap();
    binder.bind::<C>().to::<C>().finish().unwrap();
    binder.bind::<CA>().to::<CA>().finish().unwrap();
    binder.bind::<CAA>().to::<CAA>().finish().unwrap();
    binder.bind::<CAAA>().to::<CAAA>().finish().unwrap();
    binder.bind::<CAAAA>().to::<CAAAA>().finish().unwrap();
    binder.bind::<CAAAAA>().to::<CAAAAA>().finish().unwrap();
    binder
}

#[inline]
fn binder_get<T: Send + Sync + 'static>(binder: &InjectionBinder) {
    let _ = binder.get_instance::<T>().unwrap();
}

fn criterion_benchmark(c: &mut Criterion) {
    let binder_default = InjectionBinder::new();
    binder_default.bind::<B>().to::<B>().finish().unwrap();

    let binder_singleton = InjectionBinder::new();
    binder_singleton.bind::<B>().to::<B>().to_singleton().finish().unwrap();

    let binder_chain = binder_with_chain();

    let binder_implicit = InjectionBinder::new();
    binder_implicit.register::<A>();
    binder_implicit.register::<B>();
    binder_implicit.register::<C>();
    binder_implicit.register::<CA>();
    binder_implicit.register::<CAA>();
    binder_implicit.register::<CAAA>();
    binder_implicit.register::<CAAAA>();
    binder_implicit.register::<CAAAAA>();

    c.bench_function("binder_with_chain", |b| b.iter(binder_with_chain))
        .bench_function("get_instance_default", |b| b.iter(|| binder_get::<B>(&binder_default)))
        .bench_function("get_instance_singleton", |b| b.iter(|| binder_get::<B>(&binder_singleton)))
        .bench_function("get_instance_chain", |b| b.iter(|| binder_get::<A>(&binder_chain)))
        .bench_function("get_instance_chain_implicit", |b| b.iter(|| binder_get::<A>(&binder_implicit)))
        .bench_function("get_instance_chain_child", |b| b.iter(|| binder_get::<A>(&binder_chain.child())));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
