//! Leaf producers: cut an iterator (or a deferred read) into chunks.

use lazyq_core::error::Result;

use crate::traits::{Chunk, ChunkStream};

/// Chunks an iterator into batches of at most `chunk_size` elements.
///
/// Elements are pulled from the iterator only when a chunk is requested.
pub struct IterSource<I: Iterator> {
    iter: Option<I>,
    chunk_size: usize,
}

impl<I: Iterator> IterSource<I> {
    pub fn new<C>(items: C, chunk_size: usize) -> Self
    where
        C: IntoIterator<IntoIter = I, Item = I::Item>,
    {
        Self {
            iter: Some(items.into_iter()),
            chunk_size: chunk_size.max(1),
        }
    }
}

impl<I: Iterator> ChunkStream for IterSource<I> {
    type Item = I::Item;

    fn next_chunk(&mut self) -> Result<Option<Chunk<Self::Item>>> {
        let Some(iter) = self.iter.as_mut() else {
            return Ok(None);
        };
        let chunk: Vec<_> = iter.by_ref().take(self.chunk_size).collect();
        if chunk.is_empty() {
            self.iter = None;
            return Ok(None);
        }
        Ok(Some(chunk))
    }

    fn close(&mut self) {
        self.iter = None;
    }

    fn name(&self) -> &'static str {
        "iter_source"
    }
}

/// Runs `read` on the first pull, then serves the result in chunks.
///
/// Used for backing-store reads, so nothing is read until the query runs and
/// a query that is never pulled never touches the store.
///
/// `read` returns the whole result at once. For a store scan that is a
/// snapshot copy of every selected record, made on the first pull, so a
/// `take(n)` downstream still pays for cloning the full collection once; only
/// the work after the source is cut short. Id pushdown shrinks the copy.
pub struct DeferredSource<T, F>
where
    F: FnOnce() -> Result<Vec<T>>,
{
    read: Option<F>,
    buffered: Option<std::vec::IntoIter<T>>,
    chunk_size: usize,
}

impl<T, F> DeferredSource<T, F>
where
    F: FnOnce() -> Result<Vec<T>>,
{
    pub fn new(read: F, chunk_size: usize) -> Self {
        Self {
            read: Some(read),
            buffered: None,
            chunk_size: chunk_size.max(1),
        }
    }
}

impl<T, F> ChunkStream for DeferredSource<T, F>
where
    F: FnOnce() -> Result<Vec<T>>,
{
    type Item = T;

    fn next_chunk(&mut self) -> Result<Option<Chunk<T>>> {
        if let Some(read) = self.read.take() {
            self.buffered = Some(read()?.into_iter());
        }
        let Some(buffered) = self.buffered.as_mut() else {
            return Ok(None);
        };
        let chunk: Vec<T> = buffered.by_ref().take(self.chunk_size).collect();
        if chunk.is_empty() {
            self.buffered = None;
            return Ok(None);
        }
        Ok(Some(chunk))
    }

    fn close(&mut self) {
        self.read = None;
        self.buffered = None;
    }

    fn name(&self) -> &'static str {
        "deferred_source"
    }
}
