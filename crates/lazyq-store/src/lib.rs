#![forbid(unsafe_code)]
//! lazyq-store: the backing store queries read from.
//!
//! Design intent:
//! - Collection name -> (record id -> record). Iteration order of a
//!   collection is id order, so read-all output is deterministic.
//! - Only two verbs cross the boundary: read (all, or by id list) and write
//!   (upsert or delete). Missing collections and missing ids read as empty.
//! - Reads clone a snapshot under a read lock; a reader sees the collection
//!   either before or after a concurrent write, never half of one.

pub mod memory;

pub use memory::{MemoryStore, ReadQuery, RecordId, StoreQuery, StoreResponse, WriteOp, WriteQuery};
