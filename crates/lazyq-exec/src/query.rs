//! Fluent query builder.
//!
//! Every call returns a new `Query` that points at the one it was called on;
//! nothing is mutated and nothing runs until `materialize`. Calls that take a
//! dotted path validate it immediately and return `Err` for a bad one.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use lazyq_core::error::{Error, Result};
use lazyq_core::path::{Accessor, FieldPath, IntoAccessor};
use lazyq_core::predicate::Predicate;
use lazyq_core::Value;
use lazyq_planner::{Direction, Expression, HopExpression, Plan, SourceExpression};
use lazyq_store::MemoryStore;

use crate::runtime::{Engine, ExecError};

#[derive(Clone)]
pub struct Query {
    node: Arc<Node>,
}

enum Node {
    Source(SourceExpression),
    Derived { prior: Query, expression: Expression },
    Hop { prior: Query, hop: HopExpression },
}

/// Query over a collection of the process-wide store.
pub fn query_all(collection: &str) -> Result<Query> {
    Query::all(MemoryStore::global(), collection)
}

/// Query over records the caller already holds, in the order given.
pub fn from_collection<I, V>(items: I) -> Query
where
    I: IntoIterator<Item = V>,
    V: Into<Value>,
{
    Query::from_values(items.into_iter().map(Into::into).collect())
}

impl Query {
    pub fn all(store: &MemoryStore, collection: &str) -> Result<Query> {
        let source = SourceExpression::memory(store.clone(), collection)?;
        Ok(Query::root(source))
    }

    pub fn from_values(records: Vec<Value>) -> Query {
        Query::root(SourceExpression::values(records))
    }

    fn root(source: SourceExpression) -> Query {
        Query {
            node: Arc::new(Node::Source(source)),
        }
    }

    fn derive(&self, expression: Expression) -> Query {
        Query {
            node: Arc::new(Node::Derived {
                prior: self.clone(),
                expression,
            }),
        }
    }

    fn then_hop(&self, hop: HopExpression) -> Query {
        Query {
            node: Arc::new(Node::Hop {
                prior: self.clone(),
                hop,
            }),
        }
    }

    /// Keep records whose value at `accessor` satisfies `predicate`.
    pub fn where_<A: IntoAccessor>(&self, accessor: A, predicate: Predicate) -> Result<Query> {
        Ok(self.derive(Expression::Filter {
            accessor: accessor.into_accessor()?,
            predicate,
        }))
    }

    pub fn where_lambda<F>(&self, f: F) -> Query
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.derive(Expression::Filter {
            accessor: Accessor::Record,
            predicate: Predicate::lambda(f),
        })
    }

    /// Like `where_lambda`; an `Err` from `f` aborts the whole run.
    pub fn try_where_lambda<F>(&self, f: F) -> Query
    where
        F: Fn(&Value) -> Result<bool> + Send + Sync + 'static,
    {
        self.derive(Expression::Filter {
            accessor: Accessor::Record,
            predicate: Predicate::try_lambda(f),
        })
    }

    /// Traverse to related records through a path or projection.
    ///
    /// A list yields its elements; null or absent yields nothing.
    pub fn hop<A: IntoAccessor>(&self, accessor: A) -> Result<Query> {
        let accessor = accessor.into_accessor()?;
        if matches!(accessor, Accessor::Record) {
            return Err(Error::Misuse(
                "hop needs a path or a projection, not the record itself".into(),
            ));
        }
        Ok(self.then_hop(HopExpression::Accessor(accessor)))
    }

    pub fn hop_fn<F>(&self, f: F) -> Query
    where
        F: Fn(&Value) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        self.then_hop(HopExpression::Fn(Arc::new(f)))
    }

    /// Traverse to records of another store collection whose ids are held at
    /// `path` (a single id or a list of ids).
    pub fn hop_collection(&self, store: &MemoryStore, collection: &str, path: &str) -> Result<Query> {
        if collection.is_empty() {
            return Err(Error::Misuse("hop into an unnamed collection".into()));
        }
        Ok(self.then_hop(HopExpression::Collection {
            store: store.clone(),
            collection: collection.to_string(),
            path: FieldPath::parse(path)?,
        }))
    }

    /// Stable sort by the value at `accessor`; null or absent keys come first.
    pub fn order_by<A: IntoAccessor>(&self, accessor: A, direction: Direction) -> Result<Query> {
        Ok(self.derive(Expression::OrderBy {
            accessor: accessor.into_accessor()?,
            direction,
        }))
    }

    pub fn order_by_comparator<F>(&self, cmp: F) -> Query
    where
        F: Fn(&Value, &Value) -> Ordering + Send + Sync + 'static,
    {
        self.derive(Expression::OrderByComparator(Arc::new(move |a: &Value, b: &Value| Ok(cmp(a, b)))))
    }

    /// Like `order_by_comparator`; the first `Err` from `cmp` aborts the run.
    pub fn try_order_by_comparator<F>(&self, cmp: F) -> Query
    where
        F: Fn(&Value, &Value) -> Result<Ordering> + Send + Sync + 'static,
    {
        self.derive(Expression::OrderByComparator(Arc::new(cmp)))
    }

    pub fn take(&self, n: usize) -> Query {
        self.derive(Expression::Take(n))
    }

    pub fn map<F>(&self, f: F) -> Query
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.derive(Expression::Map(Arc::new(move |v| Ok(f(v)))))
    }

    pub fn try_map<F>(&self, f: F) -> Query
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.derive(Expression::Map(Arc::new(f)))
    }

    pub fn flat_map<F>(&self, f: F) -> Query
    where
        F: Fn(Value) -> Vec<Value> + Send + Sync + 'static,
    {
        self.derive(Expression::FlatMap(Arc::new(move |v| Ok(f(v)))))
    }

    pub fn try_flat_map<F>(&self, f: F) -> Query
    where
        F: Fn(Value) -> Result<Vec<Value>> + Send + Sync + 'static,
    {
        self.derive(Expression::FlatMap(Arc::new(f)))
    }

    /// Group by the key `f` returns. Emits one `[key, [members...]]` list per
    /// group, in first-occurrence order of the keys.
    pub fn group_by<F>(&self, f: F) -> Query
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        self.derive(Expression::GroupBy(Arc::new(move |v: &Value| Ok(f(v)))))
    }

    pub fn try_group_by<F>(&self, f: F) -> Query
    where
        F: Fn(&Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.derive(Expression::GroupBy(Arc::new(f)))
    }

    /// Replace the records with their count.
    pub fn count(&self) -> Query {
        self.derive(Expression::Count)
    }

    /// Fold the chain into an unoptimized plan.
    pub fn plan(&self) -> Plan {
        let mut steps: Vec<&Node> = Vec::new();
        let mut cur = self;
        let source = loop {
            let node = cur.node.as_ref();
            match node {
                Node::Source(source) => break source.clone(),
                Node::Derived { prior, .. } | Node::Hop { prior, .. } => {
                    steps.push(node);
                    cur = prior;
                }
            }
        };

        let mut plan = Plan::from_source(source);
        for node in steps.into_iter().rev() {
            match node {
                Node::Derived { expression, .. } => plan.push(expression.clone()),
                Node::Hop { hop, .. } => plan = plan.hop(hop.clone()),
                Node::Source(_) => {}
            }
        }
        plan
    }

    /// Store collections this query reads.
    pub fn implicated_datasets(&self) -> BTreeSet<String> {
        self.plan().implicated_datasets()
    }

    /// Run with an engine configured from `LAZYQ_*` environment variables,
    /// the same settings the global store is created with.
    pub fn materialize(&self) -> std::result::Result<Vec<Value>, ExecError> {
        Engine::from_env()?.materialize(self)
    }

    #[cfg(feature = "async")]
    pub async fn materialize_async(&self) -> std::result::Result<Vec<Value>, ExecError> {
        Engine::from_env()?.materialize_async(self).await
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("plan", &self.plan().explain())
            .finish()
    }
}
