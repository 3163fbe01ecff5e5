//! Chunk stream trait + combinators.
//!
//! A `ChunkStream` is consumed by calling `next_chunk` until it returns
//! `Ok(None)`. Streams are single-use; once they report the end (or an error)
//! they are not restarted.

use std::cmp::Ordering;
use std::hash::Hash;

use lazyq_core::error::Result;

use crate::count::Count;
use crate::filter::Filter;
use crate::group::GroupBy;
use crate::map::{FlatMap, Map};
use crate::sort::{OrderBy, TryOrderBy};
use crate::take::Take;

/// One batch of elements produced by a single pull. May be empty.
pub type Chunk<T> = Vec<T>;

/// Boxed stream used once operator types are chosen at runtime.
pub type BoxStream<T> = Box<dyn ChunkStream<Item = T> + Send>;

/// Trait that all chunk producers implement.
///
/// Invariants:
/// - `next_chunk` after `Ok(None)` keeps returning `Ok(None)`.
/// - `close` releases whatever the stream holds upstream and MUST be
///   idempotent. A closed stream reports `Ok(None)`.
pub trait ChunkStream {
    type Item;

    /// Pull the next chunk. This is the only suspension point of the engine.
    fn next_chunk(&mut self) -> Result<Option<Chunk<Self::Item>>>;

    /// Release upstream producers without draining them.
    fn close(&mut self) {}

    /// Human-readable operator name (stable), used in traces.
    fn name(&self) -> &'static str;
}

impl<S: ChunkStream + ?Sized> ChunkStream for Box<S> {
    type Item = S::Item;

    fn next_chunk(&mut self) -> Result<Option<Chunk<Self::Item>>> {
        (**self).next_chunk()
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Operator constructors, in the style of `Iterator` adaptors.
pub trait ChunkStreamExt: ChunkStream + Sized {
    fn filter<F>(self, pred: F) -> Filter<Self, F>
    where
        F: FnMut(&Self::Item) -> Result<bool>,
    {
        Filter::new(self, pred)
    }

    fn map<U, F>(self, f: F) -> Map<Self, F>
    where
        F: FnMut(Self::Item) -> Result<U>,
    {
        Map::new(self, f)
    }

    fn flat_map<I, F>(self, f: F) -> FlatMap<Self, F>
    where
        I: IntoIterator,
        F: FnMut(Self::Item) -> Result<I>,
    {
        FlatMap::new(self, f)
    }

    fn take(self, n: usize) -> Take<Self> {
        Take::new(self, n)
    }

    fn order_by<F>(self, cmp: F) -> OrderBy<Self, F>
    where
        F: FnMut(&Self::Item, &Self::Item) -> Ordering,
    {
        OrderBy::new(self, cmp)
    }

    fn try_order_by<F>(self, cmp: F) -> TryOrderBy<Self, F>
    where
        F: FnMut(&Self::Item, &Self::Item) -> Result<Ordering>,
    {
        TryOrderBy::new(self, cmp)
    }

    fn group_by<K, F>(self, key: F) -> GroupBy<Self, K, F>
    where
        K: Hash + Eq + Clone,
        F: FnMut(&Self::Item) -> Result<K>,
    {
        GroupBy::new(self, key)
    }

    fn count(self) -> Count<Self> {
        Count::new(self)
    }

    fn boxed(self) -> BoxStream<Self::Item>
    where
        Self: Send + 'static,
    {
        Box::new(self)
    }

    /// Close the stream when the returned guard is dropped.
    fn guarded(self) -> Guarded<Self> {
        Guarded { inner: self }
    }

    /// Pull to completion, concatenating chunks in the order produced.
    fn collect_all(self) -> Result<Vec<Self::Item>> {
        let mut stream = self.guarded();
        let mut out = Vec::new();
        while let Some(chunk) = stream.next_chunk()? {
            out.extend(chunk);
        }
        Ok(out)
    }
}

impl<S: ChunkStream + Sized> ChunkStreamExt for S {}

/// RAII wrapper: dropping it closes the wrapped stream.
///
/// Consumers that may abandon a stream half-way (errors, early returns) hold
/// one of these so upstream producers are always released.
pub struct Guarded<S: ChunkStream> {
    inner: S,
}

impl<S: ChunkStream> ChunkStream for Guarded<S> {
    type Item = S::Item;

    fn next_chunk(&mut self) -> Result<Option<Chunk<Self::Item>>> {
        self.inner.next_chunk()
    }

    fn close(&mut self) {
        self.inner.close()
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

impl<S: ChunkStream> Drop for Guarded<S> {
    fn drop(&mut self) {
        self.inner.close();
    }
}
