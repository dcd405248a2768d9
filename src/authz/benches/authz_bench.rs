//! Permission engine benchmarks
//!
//! Evaluation cost should stay flat as the grant set grows, since every
//! lookup is keyed by action and resource type.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use grc_authz::{
    ConditionalGrant, CurrentUser, PermissionEngine, PermissionGrantSet, ResourceInstance,
    StaticSession,
};
use serde_json::json;
use std::sync::Arc;

fn create_grants(type_count: usize) -> PermissionGrantSet {
    let mut builder = PermissionGrantSet::builder();
    for i in 0..type_count {
        let resource_type = format!("Type{}", i);
        builder = builder
            .grant("read", &resource_type, (0..10).map(Some))
            .grant("update", &resource_type, [Some(i as i64)])
            .conditions(
                "delete",
                &resource_type,
                None,
                vec![
                    ConditionalGrant::is("status", "Draft"),
                    ConditionalGrant::contains("owners", "$current_user"),
                ],
            );
    }
    builder.build()
}

fn engine(type_count: usize) -> PermissionEngine {
    PermissionEngine::builder()
        .grants(create_grants(type_count))
        .session(Arc::new(StaticSession::new(CurrentUser::new(7))))
        .build()
        .unwrap()
}

fn bench_is_allowed(c: &mut Criterion) {
    let mut group = c.benchmark_group("is_allowed");

    for type_count in [10, 100, 1000].iter() {
        let engine = engine(*type_count);
        group.bench_with_input(BenchmarkId::new("types", type_count), type_count, |b, _| {
            b.iter(|| {
                let context = black_box(Some(3));
                black_box(engine.is_allowed(black_box("read"), black_box("Type5"), context))
            })
        });
    }

    group.finish();
}

fn bench_is_allowed_for(c: &mut Criterion) {
    let engine = engine(100);
    let instance = ResourceInstance::new("Type5")
        .with_attribute("status", "Final")
        .with_attribute("owners", json!([{"id": 1}, {"id": 2}, {"id": 7}]));

    c.bench_function("is_allowed_for_conditions", |b| {
        b.iter(|| black_box(engine.is_allowed_for(black_box("delete"), &instance).unwrap()))
    });
}

fn bench_is_allowed_any(c: &mut Criterion) {
    let engine = engine(100);

    c.bench_function("is_allowed_any", |b| {
        b.iter(|| black_box(engine.is_allowed_any(black_box("update"), black_box("Type42"))))
    });
}

criterion_group!(benches, bench_is_allowed, bench_is_allowed_for, bench_is_allowed_any);
criterion_main!(benches);
