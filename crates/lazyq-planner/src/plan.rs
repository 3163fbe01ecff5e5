//! Plans: a source step followed by hop steps, each with its derivations.
//!
//! Build with `Plan::from_source`, `push` and `hop`. `push` always appends to
//! the outermost step, so expressions added after a hop run after that hop.

use std::collections::BTreeSet;
use std::fmt;

use lazyq_core::hash::{hash_str, Hash256};
use lazyq_core::Value;
use lazyq_store::MemoryStore;
use lazyq_stream::BoxStream;

use crate::expression::Expression;
use crate::hop::{HopExpression, NextHop};
use crate::source::SourceExpression;

#[derive(Clone, Debug)]
pub struct SourcePlan {
    pub source: SourceExpression,
    pub derivations: Vec<Expression>,
}

#[derive(Clone, Debug)]
pub struct HopPlan {
    pub prior: Box<Plan>,
    pub hop: HopExpression,
    pub derivations: Vec<Expression>,
}

#[derive(Clone, Debug)]
pub enum Plan {
    Source(SourcePlan),
    Hop(HopPlan),
}

/// A plan taken apart: the source step, then hop steps innermost first.
pub(crate) type Unwound = (
    SourceExpression,
    Vec<Expression>,
    Vec<(HopExpression, Vec<Expression>)>,
);

impl SourcePlan {
    pub fn into_stream(self, chunk_size: usize) -> BoxStream<Value> {
        let stream = self.source.open(chunk_size);
        chain_all(stream, &self.derivations)
    }
}

impl HopPlan {
    pub fn into_stream(self, chunk_size: usize) -> BoxStream<Value> {
        let upstream = self.prior.into_stream(chunk_size);
        let stream = self.hop.chain_after(upstream);
        chain_all(stream, &self.derivations)
    }
}

fn chain_all(stream: BoxStream<Value>, derivations: &[Expression]) -> BoxStream<Value> {
    derivations
        .iter()
        .fold(stream, |upstream, expr| expr.chain_after(upstream))
}

impl Plan {
    pub fn from_source(source: SourceExpression) -> Self {
        Plan::Source(SourcePlan {
            source,
            derivations: Vec::new(),
        })
    }

    /// Append `expr` to the outermost step's derivations.
    pub fn push(&mut self, expr: Expression) {
        self.derivations_mut().push(expr);
    }

    /// Wrap the plan so far in a new hop step with no derivations.
    pub fn hop(self, hop: HopExpression) -> Self {
        Plan::Hop(HopPlan {
            prior: Box::new(self),
            hop,
            derivations: Vec::new(),
        })
    }

    /// Fold a following hop step into the outermost step.
    pub fn absorb(mut self, next: NextHop) -> Self {
        let derivations = self.derivations_mut();
        derivations.push(Expression::Hop(next.hop));
        derivations.extend(next.derivations);
        self
    }

    pub fn derivations(&self) -> &[Expression] {
        match self {
            Plan::Source(p) => &p.derivations,
            Plan::Hop(p) => &p.derivations,
        }
    }

    fn derivations_mut(&mut self) -> &mut Vec<Expression> {
        match self {
            Plan::Source(p) => &mut p.derivations,
            Plan::Hop(p) => &mut p.derivations,
        }
    }

    /// Number of hop steps still standing (fused hops are derivations).
    pub fn hop_steps(&self) -> usize {
        match self {
            Plan::Source(_) => 0,
            Plan::Hop(p) => 1 + p.prior.hop_steps(),
        }
    }

    pub fn source(&self) -> &SourceExpression {
        match self {
            Plan::Source(p) => &p.source,
            Plan::Hop(p) => p.prior.source(),
        }
    }

    pub(crate) fn unwind(self) -> Unwound {
        match self {
            Plan::Source(p) => (p.source, p.derivations, Vec::new()),
            Plan::Hop(p) => {
                let (source, derivations, mut hops) = p.prior.unwind();
                hops.push((p.hop, p.derivations));
                (source, derivations, hops)
            }
        }
    }

    /// Store collections this plan reads, including fused collection hops.
    pub fn implicated_datasets(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.visit_stores(&mut |_, collection| {
            out.insert(collection.to_string());
        });
        out
    }

    /// Identity field of every store this plan reads.
    pub fn store_id_fields(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.visit_stores(&mut |store, _| {
            out.insert(store.id_field().to_string());
        });
        out
    }

    fn visit_stores(&self, f: &mut dyn FnMut(&MemoryStore, &str)) {
        let (own, derivations) = match self {
            Plan::Source(p) => (p.source.implicated_store(), &p.derivations),
            Plan::Hop(p) => {
                p.prior.visit_stores(f);
                (p.hop.implicated_store(), &p.derivations)
            }
        };
        if let Some((store, collection)) = own {
            f(store, collection);
        }
        for expr in derivations {
            if let Expression::Hop(hop) = expr {
                if let Some((store, collection)) = hop.implicated_store() {
                    f(store, collection);
                }
            }
        }
    }

    /// One line per step, innermost first:
    /// `scan(farmers) -> filter(...)` then `=> hop(animals) -> take(2)`.
    pub fn explain(&self) -> String {
        self.to_string()
    }

    /// Stable hash of `explain`, used to tell plans apart in run reports.
    pub fn fingerprint(&self) -> Hash256 {
        hash_str(&self.explain())
    }

    /// Wire the operator chain. Nothing is pulled until the stream is.
    pub fn into_stream(self, chunk_size: usize) -> BoxStream<Value> {
        match self {
            Plan::Source(p) => p.into_stream(chunk_size),
            Plan::Hop(p) => p.into_stream(chunk_size),
        }
    }
}

fn write_derivations(f: &mut fmt::Formatter<'_>, derivations: &[Expression]) -> fmt::Result {
    for expr in derivations {
        write!(f, " -> {}", expr)?;
    }
    Ok(())
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plan::Source(p) => {
                write!(f, "{}", p.source)?;
                write_derivations(f, &p.derivations)
            }
            Plan::Hop(p) => {
                writeln!(f, "{}", p.prior)?;
                write!(f, "=> {}", p.hop)?;
                write_derivations(f, &p.derivations)
            }
        }
    }
}
