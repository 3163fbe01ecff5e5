#![forbid(unsafe_code)]
//! lazyq: lazily evaluated, chunked queries over record collections.
//!
//! ```no_run
//! use lazyq::prelude::*;
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! store.upsert("farmers", vec![Value::from(serde_json::json!({"id": 0, "name": "Brown"}))])?;
//!
//! let names = Query::all(&store, "farmers")?
//!     .where_("name", Predicate::starts_with("B"))?
//!     .map(|r| r.field("name").cloned().unwrap_or_default())
//!     .materialize()?;
//! # let _ = names;
//! # Ok(())
//! # }
//! ```

pub use lazyq_core as core;
pub use lazyq_exec as exec;
pub use lazyq_planner as planner;
pub use lazyq_store as store;
pub use lazyq_stream as stream;

pub use lazyq_exec::{from_collection, query_all, Engine, ExecError, Query, RunReport};

pub mod prelude {
    pub use lazyq_core::prelude::*;
    pub use lazyq_exec::{from_collection, query_all, Engine, ExecError, Query, RunReport};
    pub use lazyq_planner::Direction;
    pub use lazyq_store::{MemoryStore, RecordId, WriteOp};
}
