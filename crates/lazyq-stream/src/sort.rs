//! Order-by operator. Blocking: drains its upstream before emitting.

use std::cmp::Ordering;

use lazyq_core::error::Result;

use crate::traits::{Chunk, ChunkStream};

/// Stable sort over the whole upstream, emitted as a single chunk.
pub struct OrderBy<S, F> {
    upstream: S,
    cmp: F,
    done: bool,
}

impl<S, F> OrderBy<S, F>
where
    S: ChunkStream,
    F: FnMut(&S::Item, &S::Item) -> Ordering,
{
    pub fn new(upstream: S, cmp: F) -> Self {
        Self {
            upstream,
            cmp,
            done: false,
        }
    }
}

impl<S, F> ChunkStream for OrderBy<S, F>
where
    S: ChunkStream,
    F: FnMut(&S::Item, &S::Item) -> Ordering,
{
    type Item = S::Item;

    fn next_chunk(&mut self) -> Result<Option<Chunk<S::Item>>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        let mut all = drain(&mut self.upstream)?;
        all.sort_by(&mut self.cmp);
        Ok(Some(all))
    }

    fn close(&mut self) {
        self.done = true;
        self.upstream.close();
    }

    fn name(&self) -> &'static str {
        "order_by"
    }
}

/// `OrderBy` with a comparator that can fail.
///
/// The first error stops further comparisons (the rest report `Equal`) and
/// is returned from `next_chunk` instead of the sorted chunk.
pub struct TryOrderBy<S, F> {
    upstream: S,
    cmp: F,
    done: bool,
}

impl<S, F> TryOrderBy<S, F>
where
    S: ChunkStream,
    F: FnMut(&S::Item, &S::Item) -> Result<Ordering>,
{
    pub fn new(upstream: S, cmp: F) -> Self {
        Self {
            upstream,
            cmp,
            done: false,
        }
    }
}

impl<S, F> ChunkStream for TryOrderBy<S, F>
where
    S: ChunkStream,
    F: FnMut(&S::Item, &S::Item) -> Result<Ordering>,
{
    type Item = S::Item;

    fn next_chunk(&mut self) -> Result<Option<Chunk<S::Item>>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        let mut all = drain(&mut self.upstream)?;

        let cmp = &mut self.cmp;
        let mut failed = None;
        all.sort_by(|a, b| {
            if failed.is_some() {
                return Ordering::Equal;
            }
            cmp(a, b).unwrap_or_else(|e| {
                failed = Some(e);
                Ordering::Equal
            })
        });
        match failed {
            Some(e) => Err(e),
            None => Ok(Some(all)),
        }
    }

    fn close(&mut self) {
        self.done = true;
        self.upstream.close();
    }

    fn name(&self) -> &'static str {
        "order_by"
    }
}

fn drain<S: ChunkStream>(upstream: &mut S) -> Result<Vec<S::Item>> {
    let mut all = Vec::new();
    while let Some(chunk) = upstream.next_chunk()? {
        all.extend(chunk);
    }
    upstream.close();
    Ok(all)
}
