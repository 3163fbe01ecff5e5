//! Map (1:1) and flat-map (1:many) operators. Both keep chunk boundaries.

use lazyq_core::error::Result;

use crate::traits::{Chunk, ChunkStream};

pub struct Map<S, F> {
    upstream: S,
    f: F,
}

impl<S, F, U> Map<S, F>
where
    S: ChunkStream,
    F: FnMut(S::Item) -> Result<U>,
{
    pub fn new(upstream: S, f: F) -> Self {
        Self { upstream, f }
    }
}

impl<S, F, U> ChunkStream for Map<S, F>
where
    S: ChunkStream,
    F: FnMut(S::Item) -> Result<U>,
{
    type Item = U;

    fn next_chunk(&mut self) -> Result<Option<Chunk<U>>> {
        let Some(chunk) = self.upstream.next_chunk()? else {
            return Ok(None);
        };
        let mapped = chunk
            .into_iter()
            .map(&mut self.f)
            .collect::<Result<Vec<U>>>()?;
        Ok(Some(mapped))
    }

    fn close(&mut self) {
        self.upstream.close();
    }

    fn name(&self) -> &'static str {
        "map"
    }
}

/// Each input element yields zero or more outputs, concatenated in input
/// order. An input chunk maps to exactly one output chunk.
pub struct FlatMap<S, F> {
    upstream: S,
    f: F,
}

impl<S, F, I> FlatMap<S, F>
where
    S: ChunkStream,
    I: IntoIterator,
    F: FnMut(S::Item) -> Result<I>,
{
    pub fn new(upstream: S, f: F) -> Self {
        Self { upstream, f }
    }
}

impl<S, F, I> ChunkStream for FlatMap<S, F>
where
    S: ChunkStream,
    I: IntoIterator,
    F: FnMut(S::Item) -> Result<I>,
{
    type Item = I::Item;

    fn next_chunk(&mut self) -> Result<Option<Chunk<I::Item>>> {
        let Some(chunk) = self.upstream.next_chunk()? else {
            return Ok(None);
        };
        let mut out = Vec::with_capacity(chunk.len());
        for item in chunk {
            out.extend((self.f)(item)?);
        }
        Ok(Some(out))
    }

    fn close(&mut self) {
        self.upstream.close();
    }

    fn name(&self) -> &'static str {
        "flat_map"
    }
}
