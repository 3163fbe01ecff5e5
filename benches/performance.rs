use criterion::{criterion_group, criterion_main, Criterion};
use lazyq::prelude::*;
use serde_json::json;

fn make_records(rows: usize) -> Vec<Value> {
    (0..rows)
        .map(|i| {
            Value::from(json!({
                "id": i,
                "group": format!("group-{}", i % 4),
                "weight": (i * 37) % 1000,
                "animals": [{"w": i % 10}, {"w": (i + 5) % 10}],
            }))
        })
        .collect()
}

fn bench_take_vs_order_by(c: &mut Criterion) {
    let records = make_records(10_000);
    let engine = Engine::new(EngineConfig::default().with_chunk_size(256)).unwrap();

    let early = Query::from_values(records.clone())
        .where_("weight", Predicate::greater_than(500))
        .unwrap()
        .take(10);
    c.bench_function("filter_take_10", |b| {
        b.iter(|| {
            let _ = engine.materialize(&early).unwrap();
        })
    });

    let sorted = Query::from_values(records)
        .order_by("weight", Direction::Desc)
        .unwrap()
        .take(10);
    c.bench_function("order_by_take_10", |b| {
        b.iter(|| {
            let _ = engine.materialize(&sorted).unwrap();
        })
    });
}

fn bench_hop_and_group(c: &mut Criterion) {
    let store = MemoryStore::new();
    store.upsert("farmers", make_records(5_000)).unwrap();
    let engine = Engine::default();

    let q = Query::all(&store, "farmers")
        .unwrap()
        .hop("animals")
        .unwrap()
        .group_by(|a| a.field("w").cloned().unwrap_or_default())
        .count();
    c.bench_function("scan_hop_group_count", |b| {
        b.iter(|| {
            let _ = engine.materialize(&q).unwrap();
        })
    });
}

criterion_group!(queries, bench_take_vs_order_by, bench_hop_and_group);
criterion_main!(queries);
