//! Group-by operator. Blocking.
//!
//! Groups come out in first-occurrence order of their key, and members keep
//! their upstream order.

use std::collections::HashMap;
use std::hash::Hash;

use lazyq_core::error::Result;

use crate::traits::{Chunk, ChunkStream};

pub struct GroupBy<S: ChunkStream, K, F> {
    upstream: S,
    key: F,
    done: bool,
    _key: std::marker::PhantomData<fn() -> K>,
}

impl<S, K, F> GroupBy<S, K, F>
where
    S: ChunkStream,
    K: Hash + Eq + Clone,
    F: FnMut(&S::Item) -> Result<K>,
{
    pub fn new(upstream: S, key: F) -> Self {
        Self {
            upstream,
            key,
            done: false,
            _key: std::marker::PhantomData,
        }
    }

    fn drain(&mut self) -> Result<Vec<(K, Vec<S::Item>)>> {
        let mut groups: Vec<(K, Vec<S::Item>)> = Vec::new();
        let mut index: HashMap<K, usize> = HashMap::new();
        while let Some(chunk) = self.upstream.next_chunk()? {
            for item in chunk {
                let k = (self.key)(&item)?;
                match index.get(&k) {
                    Some(&slot) => groups[slot].1.push(item),
                    None => {
                        index.insert(k.clone(), groups.len());
                        groups.push((k, vec![item]));
                    }
                }
            }
        }
        Ok(groups)
    }
}

impl<S, K, F> ChunkStream for GroupBy<S, K, F>
where
    S: ChunkStream,
    K: Hash + Eq + Clone,
    F: FnMut(&S::Item) -> Result<K>,
{
    type Item = (K, Vec<S::Item>);

    fn next_chunk(&mut self) -> Result<Option<Chunk<Self::Item>>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        let groups = self.drain();
        self.upstream.close();
        groups.map(Some)
    }

    fn close(&mut self) {
        self.done = true;
        self.upstream.close();
    }

    fn name(&self) -> &'static str {
        "group_by"
    }
}

#[cfg(test)]
mod tests {
    use crate::traits::testing::TrackedSource;
    use crate::traits::ChunkStreamExt;
    use lazyq_core::Error;

    #[test]
    fn test_groups_in_first_occurrence_order() {
        let (src, _) = TrackedSource::new(vec![vec!["pig", "cow"], vec!["pig", "hen", "cow"]]);
        let out = src.group_by(|s| Ok(*s)).collect_all().unwrap();
        assert_eq!(
            out,
            vec![
                ("pig", vec!["pig", "pig"]),
                ("cow", vec!["cow", "cow"]),
                ("hen", vec!["hen"]),
            ]
        );
    }

    #[test]
    fn test_members_keep_upstream_order() {
        let (src, _) = TrackedSource::new(vec![vec![(1, 'a'), (2, 'b')], vec![(1, 'c')]]);
        let out = src.group_by(|p| Ok(p.0)).collect_all().unwrap();
        assert_eq!(out[0], (1, vec![(1, 'a'), (1, 'c')]));
    }

    #[test]
    fn test_key_error_propagates() {
        let (src, _) = TrackedSource::new(vec![vec![1, 2]]);
        let g = src.group_by(|x: &i32| -> lazyq_core::Result<i32> {
            if *x == 2 {
                Err(Error::lambda("bad key"))
            } else {
                Ok(*x)
            }
        });
        assert!(g.collect_all().is_err());
    }
}
