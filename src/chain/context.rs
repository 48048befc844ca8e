//! State of one stitching run.
//!
//! Two owned mappings: the assignment table (`LineKey -> ChainId`, a forwarding table that
//! may be redirected) and the chains themselves (`ChainId -> points`, append-only). A
//! redirect only rewrites the forwarding entry; no chain ever loses or merges points.

use std::collections::HashMap;

use log::trace;

use super::{Chain, ChainId};
use crate::frame::LineKey;
use crate::geo::{distance, GeoPoint};

/// What [AggregationContext::claim] did with a candidate's line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    /// The line had no chain yet and now forwards to the claiming chain.
    Assigned,
    /// The line forwarded to `from`, whose tail was farther from the candidate point.
    Redirected { from: ChainId },
    /// The line stays with its chain.
    Kept,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregationStats {
    pub lines: usize,
    pub assigned: usize,
    pub redirects: usize,
    pub appends: usize,
    pub suppressed_appends: usize,
}

#[derive(Debug, Clone, Default)]
pub struct AggregationContext {
    assignments: HashMap<LineKey, ChainId>,
    chains: Vec<Chain>,
    stats: AggregationStats,
}

impl AggregationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn chain_for(&self, key: &LineKey) -> Option<ChainId> {
        self.assignments.get(key).copied()
    }

    /// Chain of `key`, opening a new chain at `start` if the line is unassigned.
    pub fn ensure_chain(&mut self, key: LineKey, start: GeoPoint) -> ChainId {
        if let Some(id) = self.chain_for(&key) {
            return id;
        }
        let id = ChainId(self.chains.len());
        self.chains.push(Chain::new(id, start));
        self.assignments.insert(key, id);
        trace!("line {key} opens chain {id}");
        id
    }

    /// Claims the line of `candidate` (found at `position`) for chain `current`.
    ///
    /// An unassigned line is assigned outright. A line owned by another chain is redirected
    /// only if `current`'s tail is strictly closer to the candidate point than the owner's.
    pub fn claim(&mut self, key: LineKey, position: &GeoPoint, current: ChainId) -> Claim {
        let Some(owner) = self.chain_for(&key) else {
            self.assignments.insert(key, current);
            self.stats.assigned += 1;
            return Claim::Assigned;
        };

        let ours = distance(self.chain(current).tail(), position);
        let theirs = distance(self.chain(owner).tail(), position);
        if ours < theirs {
            self.assignments.insert(key, current);
            self.stats.redirects += 1;
            trace!("line {key} redirected from chain {owner} to {current} ({ours:.3} m < {theirs:.3} m)");
            Claim::Redirected { from: owner }
        } else {
            Claim::Kept
        }
    }

    /// Appends `point` to chain `id` subject to the minimum append distance.
    pub fn extend(&mut self, id: ChainId, point: GeoPoint, min_distance: f64) -> bool {
        let appended = self.chains[id.0].try_extend(point, min_distance);
        if appended {
            self.stats.appends += 1;
        } else {
            self.stats.suppressed_appends += 1;
        }
        appended
    }

    pub(crate) fn record_line(&mut self) {
        self.stats.lines += 1;
    }

    /// Panics on an id not minted by this context.
    pub fn chain(&self, id: ChainId) -> &Chain {
        &self.chains[id.0]
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    pub fn into_chains(self) -> Vec<Chain> {
        self.chains
    }

    pub fn stats(&self) -> AggregationStats {
        self.stats
    }

    /// Every key in the table resolves to an existing chain.
    pub fn is_consistent(&self) -> bool {
        self.assignments.values().all(|id| id.0 < self.chains.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::METERS_PER_DEGREE;

    fn north(meters: f64) -> GeoPoint {
        GeoPoint::new(meters / METERS_PER_DEGREE, 0.0)
    }

    #[test]
    fn test_ensure_chain_is_lazy_and_stable() {
        let mut ctx = AggregationContext::new();
        let key = LineKey::new(0, 0);

        let a = ctx.ensure_chain(key, north(0.0));
        let b = ctx.ensure_chain(key, north(100.0));
        assert_eq!(a, b);
        assert_eq!(ctx.chains().len(), 1);
        assert_eq!(*ctx.chain(a).tail(), north(0.0));

        let c = ctx.ensure_chain(LineKey::new(0, 1), north(5.0));
        assert_eq!(c, ChainId(1));
        assert!(ctx.is_consistent());
    }

    #[test]
    fn test_claim_unassigned() {
        let mut ctx = AggregationContext::new();
        let current = ctx.ensure_chain(LineKey::new(0, 0), north(0.0));

        let key = LineKey::new(3, 2);
        assert_eq!(ctx.claim(key, &north(10.0), current), Claim::Assigned);
        assert_eq!(ctx.chain_for(&key), Some(current));
    }

    #[test]
    fn test_claim_redirects_only_when_strictly_closer() {
        let mut ctx = AggregationContext::new();
        let far = ctx.ensure_chain(LineKey::new(0, 0), north(0.0));
        let near = ctx.ensure_chain(LineKey::new(0, 1), north(8.0));
        let tie = ctx.ensure_chain(LineKey::new(0, 2), north(0.0));

        let key = LineKey::new(5, 0);
        assert_eq!(ctx.claim(key, &north(10.0), far), Claim::Assigned);

        // Same tail distance: existing owner keeps the line.
        assert_eq!(ctx.claim(key, &north(10.0), tie), Claim::Kept);
        assert_eq!(ctx.chain_for(&key), Some(far));

        assert_eq!(
            ctx.claim(key, &north(10.0), near),
            Claim::Redirected { from: far }
        );
        assert_eq!(ctx.chain_for(&key), Some(near));

        // Redirecting leaves both point logs untouched.
        assert_eq!(ctx.chain(far).len(), 1);
        assert_eq!(ctx.chain(near).len(), 1);
        assert_eq!(ctx.stats().redirects, 1);
        assert!(ctx.is_consistent());
    }

    #[test]
    fn test_extend_counts_suppressed_appends() {
        let mut ctx = AggregationContext::new();
        let id = ctx.ensure_chain(LineKey::new(0, 0), north(0.0));

        assert!(ctx.extend(id, north(5.0), 3.5));
        assert!(!ctx.extend(id, north(6.0), 3.5));

        let stats = ctx.stats();
        assert_eq!(stats.appends, 1);
        assert_eq!(stats.suppressed_appends, 1);
        assert_eq!(ctx.chain(id).len(), 2);
    }
}
