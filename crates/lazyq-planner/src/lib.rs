#![forbid(unsafe_code)]
//! lazyq-planner: expressions over records, plans, and plan rewriting.
//!
//! Design:
//! - `Expression` is the closed set of record operations. Each one knows how
//!   to attach itself after a `BoxStream<Value>` (`chain_after`).
//! - A `Plan` is a source step plus zero or more hop steps; every step owns
//!   the expressions (derivations) that run after it.
//! - `rules::optimize` consumes a plan and returns a rewritten one: adjacent
//!   hops are fused into their predecessor, and a leading id filter on a
//!   store scan becomes a read-by-ids. Rewrites never change output.
//!
//! Nothing here pulls data; `Plan::into_stream` only wires operators.

pub mod expression;
pub mod hop;
pub mod plan;
pub mod rules;
pub mod source;

pub use expression::{
    CompareFn, Direction, Expression, ExpressionKind, FlatMapFn, KeyFn, MapFn,
};
pub use hop::{HopExpression, HopFn, NextHop};
pub use plan::{HopPlan, Plan, SourcePlan};
pub use rules::optimize;
pub use source::SourceExpression;
