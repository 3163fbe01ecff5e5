//! Source expressions: where a plan's records come from.

use std::fmt;
use std::sync::Arc;

use lazyq_core::error::{Error, Result};
use lazyq_core::predicate::Predicate;
use lazyq_core::Value;
use lazyq_store::{MemoryStore, RecordId};
use lazyq_stream::{BoxStream, ChunkStreamExt, DeferredSource, IterSource};

use crate::expression::Expression;
use crate::hop::NextHop;
use crate::plan::SourcePlan;

#[derive(Clone)]
pub enum SourceExpression {
    /// A store collection. `roots` restricts the read to those ids.
    Memory {
        store: MemoryStore,
        collection: String,
        roots: Option<Vec<RecordId>>,
    },
    /// Records supplied by the caller, emitted in the order given.
    Values(Arc<Vec<Value>>),
}

impl SourceExpression {
    pub fn memory(store: MemoryStore, collection: impl Into<String>) -> Result<Self> {
        let collection = collection.into();
        if collection.is_empty() {
            return Err(Error::Misuse("query over an unnamed collection".into()));
        }
        Ok(SourceExpression::Memory {
            store,
            collection,
            roots: None,
        })
    }

    pub fn values(records: Vec<Value>) -> Self {
        SourceExpression::Values(Arc::new(records))
    }

    pub fn implicated_dataset(&self) -> Option<&str> {
        self.implicated_store().map(|(_, collection)| collection)
    }

    /// The store and collection this source reads, if any.
    pub fn implicated_store(&self) -> Option<(&MemoryStore, &str)> {
        match self {
            SourceExpression::Memory {
                store, collection, ..
            } => Some((store, collection)),
            SourceExpression::Values(_) => None,
        }
    }

    /// Producer for this source. Store reads happen on the first pull and
    /// copy the selected records out in one snapshot.
    pub fn open(&self, chunk_size: usize) -> BoxStream<Value> {
        match self {
            SourceExpression::Memory {
                store,
                collection,
                roots,
            } => {
                let store = store.clone();
                let collection = collection.clone();
                let roots = roots.clone();
                DeferredSource::new(
                    move || store.read(&collection, roots.as_deref()),
                    chunk_size,
                )
                .boxed()
            }
            SourceExpression::Values(records) => {
                let records = Arc::clone(records);
                let len = records.len();
                IterSource::new((0..len).map(move |i| records[i].clone()), chunk_size).boxed()
            }
        }
    }

    /// Replace this source step, folding `next_hop` into it when given.
    ///
    /// A store scan whose first derivation filters the id field by `Equal`
    /// or `In` reads just those ids instead, and the filter is dropped.
    pub fn optimize(self, derivations: Vec<Expression>, next_hop: Option<NextHop>) -> SourcePlan {
        let (source, mut derivations) = self.push_down_ids(derivations);
        if let Some(next) = next_hop {
            derivations.push(Expression::Hop(next.hop));
            derivations.extend(next.derivations);
        }
        SourcePlan {
            source,
            derivations,
        }
    }

    fn push_down_ids(self, derivations: Vec<Expression>) -> (Self, Vec<Expression>) {
        let (store, collection) = match self {
            SourceExpression::Memory {
                store,
                collection,
                roots: None,
            } => (store, collection),
            other => return (other, derivations),
        };
        let roots = derivations
            .first()
            .and_then(|first| id_filter_roots(first, store.id_field()));
        let Some(mut ids) = roots else {
            let source = SourceExpression::Memory {
                store,
                collection,
                roots: None,
            };
            return (source, derivations);
        };

        // Store order, so the scan emits what the unfiltered scan would have.
        ids.sort();
        ids.dedup();

        #[cfg(feature = "tracing")]
        tracing::debug!(collection = %collection, ids = ids.len(), "pushed id filter into scan");

        let source = SourceExpression::Memory {
            store,
            collection,
            roots: Some(ids),
        };
        (source, derivations.into_iter().skip(1).collect())
    }
}

/// Ids selected by `expr` when it is an `Equal`/`In` filter on `id_field`.
fn id_filter_roots(expr: &Expression, id_field: &str) -> Option<Vec<RecordId>> {
    let Expression::Filter {
        accessor,
        predicate,
    } = expr
    else {
        return None;
    };
    if !accessor.as_path().is_some_and(|p| p.is_field(id_field)) {
        return None;
    }
    match predicate {
        Predicate::Equal(v) => RecordId::from_value(v).map(|id| vec![id]),
        // every member must be a usable id, or the rewrite could drop matches
        Predicate::In(values) => values.iter().map(RecordId::from_value).collect(),
        _ => None,
    }
}

impl fmt::Display for SourceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceExpression::Memory {
                collection,
                roots: None,
                ..
            } => write!(f, "scan({})", collection),
            SourceExpression::Memory {
                collection,
                roots: Some(ids),
                ..
            } => {
                let ids: Vec<String> = ids.iter().map(ToString::to_string).collect();
                write!(f, "scan({} ids=[{}])", collection, ids.join(", "))
            }
            SourceExpression::Values(records) => write!(f, "values({})", records.len()),
        }
    }
}

impl fmt::Debug for SourceExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lazyq_core::path::Accessor;
    use serde_json::json;

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .upsert(
                "farmers",
                (0..5)
                    .map(|i| Value::from(json!({"id": i, "name": format!("f{}", i)})))
                    .collect(),
            )
            .unwrap();
        store
    }

    fn id_filter(predicate: Predicate) -> Expression {
        Expression::Filter {
            accessor: Accessor::path("id").unwrap(),
            predicate,
        }
    }

    #[test]
    fn test_memory_source_reads_lazily() {
        let store = store();
        let src = SourceExpression::memory(store.clone(), "farmers").unwrap();
        let stream = src.open(2);
        // nothing read yet; a write before the first pull is visible
        store
            .upsert("farmers", vec![Value::from(json!({"id": 9, "name": "late"}))])
            .unwrap();
        assert_eq!(stream.collect_all().unwrap().len(), 6);
    }

    #[test]
    fn test_unnamed_collection_is_misuse() {
        assert!(matches!(
            SourceExpression::memory(MemoryStore::new(), ""),
            Err(Error::Misuse(_))
        ));
    }

    #[test]
    fn test_in_filter_on_id_becomes_roots() {
        let src = SourceExpression::memory(store(), "farmers").unwrap();
        let plan = src.optimize(
            vec![id_filter(Predicate::one_of([3, 1, 3])), Expression::Take(5)],
            None,
        );
        assert_eq!(plan.source.to_string(), "scan(farmers ids=[1, 3])");
        assert_eq!(plan.derivations.len(), 1);
        let names: Vec<_> = plan
            .source
            .open(8)
            .collect_all()
            .unwrap()
            .iter()
            .filter_map(|r| r.field("name").cloned())
            .collect();
        assert_eq!(names, vec![Value::from("f1"), Value::from("f3")]);
    }

    #[test]
    fn test_pushdown_skips_non_id_and_non_leading_filters() {
        let src = SourceExpression::memory(store(), "farmers").unwrap();
        let name_filter = Expression::Filter {
            accessor: Accessor::path("name").unwrap(),
            predicate: Predicate::equals("f1"),
        };
        let plan = src
            .clone()
            .optimize(vec![name_filter.clone(), id_filter(Predicate::equals(1))], None);
        assert_eq!(plan.source.to_string(), "scan(farmers)");
        assert_eq!(plan.derivations.len(), 2);

        // a float operand cannot be turned into an id
        let plan = src.optimize(vec![id_filter(Predicate::equals(1.0))], None);
        assert_eq!(plan.source.to_string(), "scan(farmers)");
    }

    #[test]
    fn test_values_source_keeps_caller_order() {
        let src = SourceExpression::values(vec![Value::from(3), Value::from(1), Value::from(2)]);
        assert_eq!(
            src.open(1).collect_all().unwrap(),
            vec![Value::from(3), Value::from(1), Value::from(2)]
        );
        assert_eq!(src.implicated_dataset(), None);
        assert_eq!(src.to_string(), "values(3)");
    }
}
