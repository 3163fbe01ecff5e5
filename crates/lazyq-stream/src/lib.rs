#![forbid(unsafe_code)]
//! lazyq-stream: chunked lazy sequences (filter/map/flat_map/take/sort/group/count).
//!
//! Design intent:
//! - Pull-based and synchronous: a consumer calls `next_chunk` and gets the
//!   next batch, or `None` when the sequence is done. Chunk boundaries are the
//!   only points where a consumer may yield to other work.
//! - Chunk-preserving operators (filter, map, flat_map, take) hold at most one
//!   chunk. Blocking operators (order_by, group_by, count) drain upstream
//!   before emitting exactly one chunk.
//! - `take` is the only early stop; it closes and drops its upstream.
//! - Operators never catch errors; the first failure ends the pull.

pub mod count;
pub mod filter;
pub mod group;
pub mod map;
pub mod sort;
pub mod source;
pub mod take;
pub mod traits;

pub use source::{DeferredSource, IterSource};
pub use traits::{BoxStream, Chunk, ChunkStream, ChunkStreamExt, Guarded};
