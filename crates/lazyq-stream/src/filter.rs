//! Filter operator: chunk-preserving, may emit empty chunks.

use lazyq_core::error::Result;

use crate::traits::{Chunk, ChunkStream};

pub struct Filter<S, F> {
    upstream: S,
    pred: F,
}

impl<S, F> Filter<S, F>
where
    S: ChunkStream,
    F: FnMut(&S::Item) -> Result<bool>,
{
    pub fn new(upstream: S, pred: F) -> Self {
        Self { upstream, pred }
    }
}

impl<S, F> ChunkStream for Filter<S, F>
where
    S: ChunkStream,
    F: FnMut(&S::Item) -> Result<bool>,
{
    type Item = S::Item;

    fn next_chunk(&mut self) -> Result<Option<Chunk<S::Item>>> {
        let Some(chunk) = self.upstream.next_chunk()? else {
            return Ok(None);
        };
        let mut kept = Vec::with_capacity(chunk.len());
        for item in chunk {
            if (self.pred)(&item)? {
                kept.push(item);
            }
        }
        Ok(Some(kept))
    }

    fn close(&mut self) {
        self.upstream.close();
    }

    fn name(&self) -> &'static str {
        "filter"
    }
}
