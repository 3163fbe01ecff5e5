//! Count operator. Blocking; emits exactly one chunk holding the total.

use lazyq_core::error::Result;

use crate::traits::{Chunk, ChunkStream};

pub struct Count<S> {
    upstream: S,
    done: bool,
}

impl<S: ChunkStream> Count<S> {
    pub fn new(upstream: S) -> Self {
        Self {
            upstream,
            done: false,
        }
    }
}

impl<S: ChunkStream> ChunkStream for Count<S> {
    type Item = usize;

    fn next_chunk(&mut self) -> Result<Option<Chunk<usize>>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        let mut n = 0usize;
        while let Some(chunk) = self.upstream.next_chunk()? {
            n += chunk.len();
        }
        self.upstream.close();
        Ok(Some(vec![n]))
    }

    fn close(&mut self) {
        self.done = true;
        self.upstream.close();
    }

    fn name(&self) -> &'static str {
        "count"
    }
}
