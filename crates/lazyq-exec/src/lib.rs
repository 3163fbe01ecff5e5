#![forbid(unsafe_code)]
//! lazyq-exec: the query builder and the runtime that executes it.
//!
//! A `Query` is an immutable chain of nodes; every builder call returns a new
//! query sharing its prefix. `Engine::run` folds the chain into a plan,
//! optimizes it once (unless disabled), pulls the stream to completion, and
//! returns the records together with a `RunReport`.
//!
//! With the `async` feature, `materialize_async` yields to the tokio runtime
//! between chunks and otherwise behaves exactly like `materialize`.

pub mod metrics;
pub mod query;
pub mod runtime;

pub use query::{from_collection, query_all, Query};
pub use runtime::{Engine, ExecError, RunReport};
