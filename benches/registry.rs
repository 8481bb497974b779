use core::mem::offset_of;
use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use reflekt::prelude::*;

#[repr(C)]
#[derive(Clone)]
struct Node {
    type_hash: TypeHash,
    weight: i32,
}

unsafe impl Reflect for Node {
    fn describe(builder: &mut TypeBuilder) {
        builder.property::<i32>("weight", offset_of!(Node, weight));
    }

    fn runtime_hash(&self) -> TypeHash {
        self.type_hash
    }
}

#[repr(C)]
#[derive(Clone)]
struct LeafNode {
    base: Node,
    depth: i32,
}

impl LeafNode {
    fn new() -> Self {
        Self {
            base: Node {
                type_hash: TypeHash::of::<LeafNode>(),
                weight: 1,
            },
            depth: 3,
        }
    }
}

unsafe impl Reflect for LeafNode {
    fn super_link() -> Option<TypeRef> {
        Some(TypeRef::of::<Node>())
    }

    fn runtime_hash(&self) -> TypeHash {
        self.base.type_hash
    }
}

fn bench_reflection(c: &mut Criterion) {
    let registry = TypeRegistry::new();
    registry.descriptor_of::<LeafNode>();
    let leaf = LeafNode::new();

    c.bench_function("descriptor_lookup", |b| {
        b.iter(|| black_box(registry.descriptor_of::<LeafNode>()))
    });

    c.bench_function("upcast", |b| {
        b.iter(|| black_box(registry.cast_ref::<Node, _>(black_box(&leaf))))
    });

    c.bench_function("dynamic_downcast", |b| {
        let node: &Node = registry.cast_ref(&leaf).unwrap();
        b.iter(|| black_box(registry.cast_ref::<LeafNode, _>(black_box(node))))
    });

    c.bench_function("property_get", |b| {
        let weight = registry.descriptor_of::<Node>().property("weight").unwrap();
        b.iter(|| black_box(weight.get::<i32, _>(&registry, black_box(&leaf))))
    });
}

criterion_group!(benches, bench_reflection);
criterion_main!(benches);
