//! Benchmarks for the diff engine hot paths: wide keyed lists (reorder),
//! deep nesting (recursion), and attribute churn.

use criterion::{Criterion, criterion_group, criterion_main};
use ripple_dom::{Element, Node, diff};
use std::hint::black_box;

fn keyed_list(n: usize, rotate: usize) -> Node {
    let mut el = Element::new("ul");
    for i in 0..n {
        let k = (i + rotate) % n;
        el = el.with_child(Node::from(
            Element::new("li")
                .with_key(format!("k{k}"))
                .with_child(Node::text(format!("item {k}"))),
        ));
    }
    el.into()
}

fn deep_chain(depth: usize, payload: &str) -> Node {
    let mut node = Node::text(payload);
    for _ in 0..depth {
        node = Element::new("div").with_child(node).into();
    }
    node
}

fn attr_heavy(n: usize, seed: u8) -> Node {
    let mut el = Element::new("div");
    for i in 0..n {
        el = el.with_attr(format!("a{i}"), format!("{}", i as u8 ^ seed));
    }
    el.into()
}

fn bench_keyed_reorder(c: &mut Criterion) {
    let old = keyed_list(100, 0);
    let new = keyed_list(100, 37);
    c.bench_function("diff/keyed_reorder_100", |b| {
        b.iter(|| diff(black_box(&old), black_box(&new)))
    });
}

fn bench_identical(c: &mut Criterion) {
    let tree = keyed_list(100, 0);
    c.bench_function("diff/identical_100", |b| {
        b.iter(|| diff(black_box(&tree), black_box(&tree)))
    });
}

fn bench_deep(c: &mut Criterion) {
    let old = deep_chain(64, "a");
    let new = deep_chain(64, "b");
    c.bench_function("diff/deep_64", |b| {
        b.iter(|| diff(black_box(&old), black_box(&new)))
    });
}

fn bench_attrs(c: &mut Criterion) {
    let old = attr_heavy(64, 0);
    let new = attr_heavy(64, 0x2a);
    c.bench_function("diff/attrs_64", |b| {
        b.iter(|| diff(black_box(&old), black_box(&new)))
    });
}

criterion_group!(
    benches,
    bench_keyed_reorder,
    bench_identical,
    bench_deep,
    bench_attrs
);
criterion_main!(benches);
