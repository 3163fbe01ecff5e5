//! Laziness, ordering, and error-propagation guarantees of materialize.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use lazyq::prelude::*;
use serde_json::json;

fn engine(chunk_size: usize) -> Engine {
    Engine::new(EngineConfig::default().with_chunk_size(chunk_size)).unwrap()
}

fn numbers(n: i64) -> Query {
    from_collection((0..n).map(Value::from))
}

/// Map that counts how many elements reached it.
fn counting(q: &Query) -> (Query, Arc<AtomicUsize>) {
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let q = q.map(move |v| {
        counter.fetch_add(1, Ordering::SeqCst);
        v
    });
    (q, seen)
}

#[test]
fn test_take_never_produces_past_limit() {
    let (q, seen) = counting(&numbers(100));
    let out = engine(1).materialize(&q.take(3)).unwrap();
    assert_eq!(out, vec![Value::from(0), Value::from(1), Value::from(2)]);
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[test]
fn test_take_more_than_available_emits_all() {
    let out = engine(4).materialize(&numbers(5).take(50)).unwrap();
    assert_eq!(out.len(), 5);
    assert!(engine(4).materialize(&numbers(5).take(0)).unwrap().is_empty());
}

#[test]
fn test_take_after_store_scan_stops_early() {
    let store = MemoryStore::new();
    store
        .upsert("n", (0..50).map(|i| Value::from(json!({"id": i}))).collect())
        .unwrap();
    let (q, seen) = counting(&Query::all(&store, "n").unwrap());
    let (out, report) = engine(5).run(&q.take(7)).unwrap();
    assert_eq!(out.len(), 7);
    // two source chunks of five
    assert_eq!(seen.load(Ordering::SeqCst), 10);
    assert_eq!(report.chunks, 2);
}

#[test]
fn test_order_by_is_stable() {
    let q = from_collection(vec![
        json!({"k": 1, "tag": "a"}),
        json!({"k": 0, "tag": "b"}),
        json!({"k": 1, "tag": "c"}),
        json!({"k": 0, "tag": "d"}),
    ])
    .order_by("k", Direction::Asc)
    .unwrap()
    .map(|r| r.field("tag").cloned().unwrap_or_default());
    let out = engine(1).materialize(&q).unwrap();
    assert_eq!(
        out,
        vec![Value::from("b"), Value::from("d"), Value::from("a"), Value::from("c")]
    );
}

#[test]
fn test_order_by_comparator_sees_whole_input() {
    let q = numbers(6).order_by_comparator(|a, b| b.total_cmp(a));
    let out = engine(2).materialize(&q).unwrap();
    assert_eq!(out.first(), Some(&Value::from(5)));
    assert_eq!(out.last(), Some(&Value::from(0)));
}

#[test]
fn test_null_keys_sort_first_in_both_directions() {
    let records = vec![
        json!({"name": "a", "w": 5}),
        json!({"name": "b"}),
        json!({"name": "c", "w": 9}),
        json!({"name": "d", "w": null}),
    ];
    let order = |direction| -> Vec<Value> {
        let q = from_collection(records.clone())
            .order_by("w", direction)
            .unwrap()
            .map(|r| r.field("name").cloned().unwrap_or_default());
        q.materialize().unwrap()
    };
    let as_values = |names: &[&str]| names.iter().map(|n| Value::from(*n)).collect::<Vec<_>>();
    assert_eq!(order(Direction::Asc), as_values(&["b", "d", "a", "c"]));
    assert_eq!(order(Direction::Desc), as_values(&["b", "d", "c", "a"]));
}

#[test]
fn test_group_by_key_and_member_order() {
    let q = from_collection(vec![
        json!({"kind": "pig", "n": 1}),
        json!({"kind": "cow", "n": 2}),
        json!({"kind": "pig", "n": 3}),
        json!({"kind": "hen", "n": 4}),
        json!({"kind": "cow", "n": 5}),
    ])
    .group_by(|r| r.field("kind").cloned().unwrap_or_default());
    let out = engine(2).materialize(&q).unwrap();
    assert_eq!(
        out,
        vec![
            Value::from(json!(["pig", [{"kind": "pig", "n": 1}, {"kind": "pig", "n": 3}]])),
            Value::from(json!(["cow", [{"kind": "cow", "n": 2}, {"kind": "cow", "n": 5}]])),
            Value::from(json!(["hen", [{"kind": "hen", "n": 4}]])),
        ]
    );
}

#[test]
fn test_count() {
    let q = numbers(10).where_lambda(|v| v.as_i64().is_some_and(|i| i % 3 == 0)).count();
    assert_eq!(engine(4).materialize(&q).unwrap(), vec![Value::from(4)]);
}

#[test]
fn test_hop_concatenates_per_record_relations() {
    let q = from_collection(vec![
        json!({"kids": [1, 2]}),
        json!({"kids": []}),
        json!({}),
        json!({"kids": null}),
        json!({"kids": [3]}),
    ])
    .hop("kids")
    .unwrap();
    assert_eq!(
        engine(1).materialize(&q).unwrap(),
        vec![Value::from(1), Value::from(2), Value::from(3)]
    );
}

#[test]
fn test_hop_fn_and_flat_map() {
    let q = numbers(4)
        .hop_fn(|v| Ok(vec![v.clone(), v.clone()]))
        .flat_map(|v| if v == Value::from(2) { vec![] } else { vec![v] });
    let out = engine(3).materialize(&q).unwrap();
    assert_eq!(
        out,
        vec![0, 0, 1, 1, 3, 3].into_iter().map(Value::from).collect::<Vec<_>>()
    );
}

#[test]
fn test_lambda_failure_aborts_at_failing_element() {
    let (q, seen) = counting(&numbers(10));
    let q = q.try_where_lambda(|v| {
        if v.as_i64() == Some(2) {
            Err(Error::lambda("bad record 2"))
        } else {
            Ok(true)
        }
    });
    let err = engine(1).materialize(&q).unwrap_err();
    assert!(matches!(err, ExecError::Query(Error::Lambda(_))));
    assert_eq!(seen.load(Ordering::SeqCst), 3);
}

#[test]
fn test_group_key_failure_propagates() {
    let q = numbers(3).try_group_by(|_| Err(Error::lambda("no key")));
    assert!(q.materialize().is_err());
}

#[test]
fn test_comparator_failure_propagates() {
    let (q, seen) = counting(&numbers(20));
    let q = q
        .try_order_by_comparator(|a, b| match (a.as_i64(), b.as_i64()) {
            (Some(7), _) | (_, Some(7)) => Err(Error::lambda("7 is not comparable")),
            _ => Ok(a.total_cmp(b)),
        })
        .take(3);
    let err = engine(4).materialize(&q).unwrap_err();
    assert!(matches!(err, ExecError::Query(Error::Lambda(_))));
    assert_eq!(seen.load(Ordering::SeqCst), 20);
}

#[test]
fn test_group_by_large_numeric_keys_is_order_independent() {
    let big = 1i64 << 53;
    let keys = vec![Value::Int(big), Value::Float(big as f64), Value::Int(big + 1)];
    let groups = |items: Vec<Value>| {
        from_collection(items)
            .group_by(|v| v.clone())
            .count()
            .materialize()
            .unwrap()
    };
    let mut reordered = keys.clone();
    reordered.swap(0, 1);
    assert_eq!(groups(keys), vec![Value::from(2)]);
    assert_eq!(groups(reordered), vec![Value::from(2)]);
}

#[test]
fn test_materialize_matches_eager_evaluation() {
    let records: Vec<Value> = (0..40)
        .map(|i| Value::from(json!({"id": i, "w": (i * 7) % 11, "tags": vec![i; (i % 3) as usize]})))
        .collect();

    // eager: filter w > 3, flatten tags, keep odd, first 10
    let eager: Vec<Value> = records
        .iter()
        .filter(|r| r.field("w").and_then(Value::as_i64).unwrap_or(0) > 3)
        .flat_map(|r| r.field("tags").and_then(Value::as_list).unwrap_or(&[]).to_vec())
        .filter(|t| t.as_i64().is_some_and(|i| i % 2 == 1))
        .take(10)
        .collect();

    let q = Query::from_values(records)
        .where_("w", Predicate::greater_than(3))
        .unwrap()
        .hop("tags")
        .unwrap()
        .where_lambda(|t| t.as_i64().is_some_and(|i| i % 2 == 1))
        .take(10);

    for chunk_size in [1, 4, 9, 256] {
        for optimize in [true, false] {
            let cfg = EngineConfig::default()
                .with_chunk_size(chunk_size)
                .with_optimize(optimize);
            assert_eq!(Engine::new(cfg).unwrap().materialize(&q).unwrap(), eager);
        }
    }
}

#[test]
fn test_runs_with_tracing_subscriber() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("trace"))
        .with_test_writer()
        .try_init();
    let q = numbers(5).hop_fn(|v| Ok(vec![v.clone()])).take(2);
    assert_eq!(q.materialize().unwrap().len(), 2);
}
