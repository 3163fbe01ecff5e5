//! Hops: one-to-many traversal from a record to related records.

use std::fmt;
use std::sync::Arc;

use lazyq_core::error::Result;
use lazyq_core::path::{Accessor, FieldPath};
use lazyq_core::Value;
use lazyq_store::{MemoryStore, RecordId};
use lazyq_stream::{BoxStream, ChunkStreamExt};

use crate::expression::Expression;
use crate::plan::{HopPlan, Plan};

pub type HopFn = Arc<dyn Fn(&Value) -> Result<Vec<Value>> + Send + Sync>;

#[derive(Clone)]
pub enum HopExpression {
    /// Follow an accessor. A list result yields its elements, a null or
    /// absent result yields nothing, anything else yields itself.
    Accessor(Accessor),
    /// Caller function returning the related records.
    Fn(HopFn),
    /// Read the id (or list of ids) at `path` and fetch those records from
    /// another store collection.
    Collection {
        store: MemoryStore,
        collection: String,
        path: FieldPath,
    },
}

/// The hop step that follows a node, offered to it for fusion.
#[derive(Clone)]
pub struct NextHop {
    pub hop: HopExpression,
    pub derivations: Vec<Expression>,
}

impl HopExpression {
    /// Whether this hop can run as a plain derivation of the node before it.
    ///
    /// Collection hops stay separate steps since they read another dataset.
    pub fn is_fusible(&self) -> bool {
        !matches!(self, HopExpression::Collection { .. })
    }

    pub fn implicated_dataset(&self) -> Option<&str> {
        self.implicated_store().map(|(_, collection)| collection)
    }

    pub fn implicated_store(&self) -> Option<(&MemoryStore, &str)> {
        match self {
            HopExpression::Collection {
                store, collection, ..
            } => Some((store, collection)),
            _ => None,
        }
    }

    /// Related records of one input record, in relation order.
    pub fn traverse(&self, record: &Value) -> Result<Vec<Value>> {
        match self {
            HopExpression::Accessor(accessor) => {
                Ok(spread(accessor.get(record).map(|v| v.into_owned())))
            }
            HopExpression::Fn(f) => f(record),
            HopExpression::Collection {
                store,
                collection,
                path,
            } => {
                let ids: Vec<RecordId> = spread(path.get(record).cloned())
                    .iter()
                    .filter_map(RecordId::from_value)
                    .collect();
                if ids.is_empty() {
                    return Ok(Vec::new());
                }
                store.read(collection, Some(&ids))
            }
        }
    }

    pub fn chain_after(&self, upstream: BoxStream<Value>) -> BoxStream<Value> {
        let hop = self.clone();
        upstream.flat_map(move |r| hop.traverse(&r)).boxed()
    }

    /// Replace this hop step, folding `next_hop` into it when given.
    ///
    /// The result's derivations are this step's own, then the next hop, then
    /// the next hop's derivations.
    pub fn optimize(
        self,
        prior: Plan,
        derivations: Vec<Expression>,
        next_hop: Option<NextHop>,
    ) -> HopPlan {
        let mut derivations = derivations;
        if let Some(next) = next_hop {
            derivations.push(Expression::Hop(next.hop));
            derivations.extend(next.derivations);
        }
        HopPlan {
            prior: Box::new(prior),
            hop: self,
            derivations,
        }
    }
}

fn spread(v: Option<Value>) -> Vec<Value> {
    match v {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::List(items)) => items,
        Some(other) => vec![other],
    }
}

impl fmt::Display for HopExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HopExpression::Accessor(accessor) => write!(f, "hop({})", accessor),
            HopExpression::Fn(_) => f.write_str("hop(<fn>)"),
            HopExpression::Collection {
                collection, path, ..
            } => write!(f, "hop({} -> {})", path, collection),
        }
    }
}

impl fmt::Debug for HopExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
