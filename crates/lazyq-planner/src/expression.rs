//! The expression algebra: every operation a query can apply to records.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use lazyq_core::error::Result;
use lazyq_core::path::Accessor;
use lazyq_core::predicate::Predicate;
use lazyq_core::value::{Value, ValueKey};
use lazyq_stream::{BoxStream, ChunkStreamExt};

use crate::hop::HopExpression;

pub type MapFn = Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>;
pub type FlatMapFn = Arc<dyn Fn(Value) -> Result<Vec<Value>> + Send + Sync>;
pub type KeyFn = Arc<dyn Fn(&Value) -> Result<Value> + Send + Sync>;
pub type CompareFn = Arc<dyn Fn(&Value, &Value) -> Result<Ordering> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        })
    }
}

/// Payload-free tag of an `Expression`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExpressionKind {
    Take,
    Filter,
    Map,
    OrderBy,
    OrderByComparator,
    GroupBy,
    FlatMap,
    Hop,
    Count,
}

impl ExpressionKind {
    /// Blocking operations read their whole input before emitting anything.
    pub fn is_blocking(self) -> bool {
        matches!(
            self,
            ExpressionKind::OrderBy
                | ExpressionKind::OrderByComparator
                | ExpressionKind::GroupBy
                | ExpressionKind::Count
        )
    }
}

/// One record operation. Immutable once built; owns no stream.
#[derive(Clone)]
pub enum Expression {
    Take(usize),
    Filter {
        accessor: Accessor,
        predicate: Predicate,
    },
    Map(MapFn),
    /// Null or absent keys sort first in both directions.
    OrderBy {
        accessor: Accessor,
        direction: Direction,
    },
    OrderByComparator(CompareFn),
    /// Emits one `[key, [members...]]` list per group.
    GroupBy(KeyFn),
    FlatMap(FlatMapFn),
    Hop(HopExpression),
    /// Emits a single integer.
    Count,
}

impl Expression {
    pub fn kind(&self) -> ExpressionKind {
        match self {
            Expression::Take(_) => ExpressionKind::Take,
            Expression::Filter { .. } => ExpressionKind::Filter,
            Expression::Map(_) => ExpressionKind::Map,
            Expression::OrderBy { .. } => ExpressionKind::OrderBy,
            Expression::OrderByComparator(_) => ExpressionKind::OrderByComparator,
            Expression::GroupBy(_) => ExpressionKind::GroupBy,
            Expression::FlatMap(_) => ExpressionKind::FlatMap,
            Expression::Hop(_) => ExpressionKind::Hop,
            Expression::Count => ExpressionKind::Count,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.kind().is_blocking()
    }

    /// Attach this operation after `upstream`.
    pub fn chain_after(&self, upstream: BoxStream<Value>) -> BoxStream<Value> {
        match self {
            Expression::Take(n) => upstream.take(*n).boxed(),
            Expression::Filter {
                accessor,
                predicate,
            } => {
                let accessor = accessor.clone();
                let predicate = predicate.clone();
                upstream
                    .filter(move |r| predicate.call(accessor.get(r).as_deref()))
                    .boxed()
            }
            Expression::Map(f) => {
                let f = Arc::clone(f);
                upstream.map(move |r| f(r)).boxed()
            }
            Expression::OrderBy {
                accessor,
                direction,
            } => {
                let accessor = accessor.clone();
                let direction = *direction;
                upstream
                    .order_by(move |a, b| {
                        compare_keys(
                            accessor.get(a).as_deref(),
                            accessor.get(b).as_deref(),
                            direction,
                        )
                    })
                    .boxed()
            }
            Expression::OrderByComparator(cmp) => {
                let cmp = Arc::clone(cmp);
                upstream.try_order_by(move |a, b| cmp(a, b)).boxed()
            }
            Expression::GroupBy(key) => {
                let key = Arc::clone(key);
                upstream
                    .group_by(move |r| key(r).map(ValueKey))
                    .map(|(k, members)| Ok(Value::pair(k.0, members)))
                    .boxed()
            }
            Expression::FlatMap(f) => {
                let f = Arc::clone(f);
                upstream.flat_map(move |r| f(r)).boxed()
            }
            Expression::Hop(hop) => hop.chain_after(upstream),
            Expression::Count => upstream.count().map(|n| Ok(Value::from(n))).boxed(),
        }
    }
}

/// Sort-key comparison for `OrderBy`.
///
/// A null or absent key is less than any present key regardless of
/// `direction`; only present keys are reversed for `Desc`.
pub fn compare_keys(a: Option<&Value>, b: Option<&Value>, direction: Direction) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => match direction {
            Direction::Asc => a.total_cmp(b),
            Direction::Desc => b.total_cmp(a),
        },
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Take(n) => write!(f, "take({})", n),
            Expression::Filter {
                accessor,
                predicate,
            } => write!(f, "filter({} {})", accessor, predicate),
            Expression::Map(_) => f.write_str("map(<fn>)"),
            Expression::OrderBy {
                accessor,
                direction,
            } => write!(f, "order_by({} {})", accessor, direction),
            Expression::OrderByComparator(_) => f.write_str("order_by(<fn>)"),
            Expression::GroupBy(_) => f.write_str("group_by(<fn>)"),
            Expression::FlatMap(_) => f.write_str("flat_map(<fn>)"),
            Expression::Hop(hop) => write!(f, "{}", hop),
            Expression::Count => f.write_str("count"),
        }
    }
}

impl fmt::Debug for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
