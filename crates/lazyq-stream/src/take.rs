//! Take operator: stops pulling once it has enough.

use lazyq_core::error::Result;

use crate::traits::{Chunk, ChunkStream};

/// Emits at most `n` elements, then closes its upstream.
///
/// The upstream is never pulled again after the limit is reached, and with
/// `n == 0` it is not pulled at all.
pub struct Take<S: ChunkStream> {
    upstream: Option<S>,
    remaining: usize,
}

impl<S: ChunkStream> Take<S> {
    pub fn new(upstream: S, n: usize) -> Self {
        let mut take = Self {
            upstream: Some(upstream),
            remaining: n,
        };
        if n == 0 {
            take.release();
        }
        take
    }

    fn release(&mut self) {
        if let Some(mut up) = self.upstream.take() {
            up.close();
        }
    }
}

impl<S: ChunkStream> ChunkStream for Take<S> {
    type Item = S::Item;

    fn next_chunk(&mut self) -> Result<Option<Chunk<S::Item>>> {
        let Some(up) = self.upstream.as_mut() else {
            return Ok(None);
        };
        let Some(mut chunk) = up.next_chunk()? else {
            self.upstream = None;
            return Ok(None);
        };
        if chunk.len() >= self.remaining {
            chunk.truncate(self.remaining);
            self.remaining = 0;
            self.release();
        } else {
            self.remaining -= chunk.len();
        }
        Ok(Some(chunk))
    }

    fn close(&mut self) {
        self.release();
    }

    fn name(&self) -> &'static str {
        "take"
    }
}
