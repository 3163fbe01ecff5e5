//! Plan rewriting driver.
//!
//! Steps are visited innermost first: the source step is optimized, then each
//! hop step in chain order against the already-optimized prefix. A step is
//! offered the hop that follows it when that hop is fusible; any further
//! fusible hops are absorbed into the same step. Fusion only concatenates
//! derivation lists in chain order, so the rewritten plan runs the same
//! operations in the same order as the unrewritten plan.

use std::iter::Peekable;
use std::vec::IntoIter;

use crate::expression::Expression;
use crate::hop::{HopExpression, NextHop};
use crate::plan::Plan;

type HopSteps = Peekable<IntoIter<(HopExpression, Vec<Expression>)>>;

/// Rewrite `plan` (hop fusion, id pushdown). Output is unchanged.
pub fn optimize(plan: Plan) -> Plan {
    #[cfg(feature = "tracing")]
    let before = plan.explain();

    let (source, derivations, hops) = plan.unwind();
    let mut hops: HopSteps = hops.into_iter().peekable();

    let next = next_fusible(&mut hops);
    let mut out = Plan::Source(source.optimize(derivations, next));

    while let Some((hop, derivations)) = hops.next() {
        if hop.is_fusible() {
            out = out.absorb(NextHop { hop, derivations });
            continue;
        }
        let next = next_fusible(&mut hops);
        out = Plan::Hop(hop.optimize(out, derivations, next));
    }

    #[cfg(feature = "tracing")]
    tracing::debug!(before = %before, after = %out.explain(), "optimized plan");

    out
}

fn next_fusible(hops: &mut HopSteps) -> Option<NextHop> {
    if !hops.peek().is_some_and(|(hop, _)| hop.is_fusible()) {
        return None;
    }
    hops.next()
        .map(|(hop, derivations)| NextHop { hop, derivations })
}
