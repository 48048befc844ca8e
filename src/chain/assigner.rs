use log::{debug, trace};

use super::{AggregationContext, ChainId, Claim};
use crate::frame::{FrameRecord, LineKey, Segment};
use crate::geo::GeoPoint;
use crate::matcher::Matcher;
use crate::math::{fuse_from, Observation};
use crate::sampling::Sampler;

/// Result of processing one line of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineOutcome {
    pub chain: ChainId,
    /// Accepted forward candidates, fused after the line's own end point.
    pub candidates: usize,
    pub redirects: usize,
    pub appended: bool,
}

/// The sequential pass that maps every detected line onto a chain.
///
/// Frames must be visited in ascending ordinal order: a line's chain is decided by the
/// lines of earlier frames that matched it, and a later frame may redirect a line that an
/// earlier one claimed.
pub struct ChainAssigner<'a> {
    sampler: Sampler,
    matcher: &'a Matcher<'a>,
    min_append_distance: f64,
}

impl<'a> ChainAssigner<'a> {
    pub fn new(sampler: Sampler, matcher: &'a Matcher<'a>, min_append_distance: f64) -> Self {
        Self {
            sampler,
            matcher,
            min_append_distance,
        }
    }

    /// Runs the pass over `frames`, whose positions are the ordinals the matcher was built on.
    pub fn run(&self, frames: &[FrameRecord]) -> AggregationContext {
        let mut ctx = AggregationContext::new();

        for (ordinal, frame) in frames.iter().enumerate() {
            for (line, (id, segment)) in frame.lines.iter().enumerate() {
                let key = LineKey::new(ordinal, line);
                let outcome = self.process_line(&mut ctx, &frame.camera, key, segment);
                trace!(
                    "frame {} line {id}: chain {}, {} candidates, appended {}",
                    frame.frame_number,
                    outcome.chain,
                    outcome.candidates,
                    outcome.appended
                );
            }
            debug!(
                "frame {} ({}/{}): {} lines, {} chains",
                frame.frame_number,
                ordinal + 1,
                frames.len(),
                frame.lines.len(),
                ctx.chains().len()
            );
        }

        ctx
    }

    /// Processes one line: resolve or open its chain, claim forward matches of its end
    /// point, fuse them onto the end point, and extend the chain with the result.
    pub fn process_line(
        &self,
        ctx: &mut AggregationContext,
        camera: &GeoPoint,
        key: LineKey,
        segment: &Segment,
    ) -> LineOutcome {
        ctx.record_line();
        let chain = ctx.ensure_chain(key, segment.start);
        let end = self.sampler.end_point_with_variance(&segment.end, camera);

        let candidates = self.matcher.find_candidates(&segment.end, key.frame);
        let mut redirects = 0;
        for candidate in &candidates {
            if let Claim::Redirected { .. } = ctx.claim(candidate.key, &candidate.position, chain) {
                redirects += 1;
            }
        }

        let observations: Vec<Observation> = candidates.iter().map(|c| c.observation()).collect();
        let fused = fuse_from(end, &observations);
        let appended = ctx.extend(chain, fused.position, self.min_append_distance);

        LineOutcome {
            chain,
            candidates: candidates.len(),
            redirects,
            appended,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StitchConfig;
    use crate::geo::{distance, METERS_PER_DEGREE};
    use crate::sampling::PointTable;

    fn at(east: f64, north: f64) -> GeoPoint {
        GeoPoint::new(north / METERS_PER_DEGREE, east / METERS_PER_DEGREE)
    }

    fn run(frames: &[FrameRecord]) -> AggregationContext {
        let config = StitchConfig::default();
        let sampler = Sampler::from_config(&config);
        let table = PointTable::build(frames, &sampler, false);
        let matcher = Matcher::new(&table, &config);
        ChainAssigner::new(sampler, &matcher, config.min_append_distance).run(frames)
    }

    #[test]
    fn test_matched_lines_extend_one_chain() {
        let frames = vec![
            FrameRecord::new(0, at(0.0, 10.0))
                .with_line("0", Segment::new(at(0.0, 0.0), at(0.0, 20.0))),
            FrameRecord::new(1, at(0.0, 30.0))
                .with_line("0", Segment::new(at(0.0, 20.0), at(0.0, 40.0))),
        ];
        let ctx = run(&frames);

        assert_eq!(ctx.chains().len(), 1);
        assert_eq!(ctx.chain_for(&LineKey::new(1, 0)), Some(ChainId(0)));
        assert_eq!(ctx.chain(ChainId(0)).len(), 3);
        assert_eq!(ctx.stats().lines, 2);
        assert_eq!(ctx.stats().assigned, 1);
    }

    #[test]
    fn test_short_segment_does_not_extend_chain() {
        let frames = vec![FrameRecord::new(0, at(0.0, 0.0))
            .with_line("0", Segment::new(at(0.0, 5.0), at(0.0, 6.0)))];
        let ctx = run(&frames);

        assert_eq!(ctx.chains().len(), 1);
        assert_eq!(ctx.chain(ChainId(0)).len(), 1);
        assert_eq!(ctx.stats().suppressed_appends, 1);
    }

    #[test]
    fn test_closer_chain_redirects_claimed_line() {
        let frames = vec![
            FrameRecord::new(0, at(0.0, 0.0))
                .with_line("a", Segment::new(at(0.0, 0.0), at(0.0, 10.0))),
            FrameRecord::new(1, at(0.0, 10.0))
                .with_line("b", Segment::new(at(1.2, 25.0), at(1.2, 29.5))),
            FrameRecord::new(2, at(0.0, 20.0))
                .with_line("c", Segment::new(at(0.5, 10.0), at(0.5, 30.0))),
        ];
        let config = StitchConfig::default();
        let sampler = Sampler::from_config(&config);
        let table = PointTable::build(&frames, &sampler, false);
        let matcher = Matcher::new(&table, &config);
        let assigner = ChainAssigner::new(sampler, &matcher, config.min_append_distance);

        let mut ctx = AggregationContext::new();
        let c = LineKey::new(2, 0);

        // "a" ends next to the start of "c" and claims it.
        let first = assigner.process_line(
            &mut ctx,
            &frames[0].camera,
            LineKey::new(0, 0),
            &frames[0].lines[0].1,
        );
        assert_eq!(first.chain, ChainId(0));
        assert_eq!(first.candidates, 1);
        assert_eq!(ctx.chain_for(&c), Some(ChainId(0)));
        let claimed_tail = *ctx.chain(ChainId(0)).tail();

        // "b" opens a new chain whose start is much nearer the far end of "c".
        let second = assigner.process_line(
            &mut ctx,
            &frames[1].camera,
            LineKey::new(1, 0),
            &frames[1].lines[0].1,
        );
        assert_eq!(second.chain, ChainId(1));
        assert_eq!(second.redirects, 1);
        assert_eq!(ctx.chain_for(&c), Some(ChainId(1)));

        // The old chain keeps its points.
        assert_eq!(ctx.chain(ChainId(0)).len(), 2);
        assert_eq!(*ctx.chain(ChainId(0)).tail(), claimed_tail);

        let third = assigner.process_line(
            &mut ctx,
            &frames[2].camera,
            c,
            &frames[2].lines[0].1,
        );
        assert_eq!(third.chain, ChainId(1));
        assert_eq!(ctx.chains().len(), 2);
        assert!(ctx.is_consistent());
    }

    #[test]
    fn test_candidate_already_on_current_chain_is_kept() {
        // Frame 2's line is matched from frames 0 and 1, which already share a chain.
        let frames = vec![
            FrameRecord::new(0, at(0.0, 10.0))
                .with_line("0", Segment::new(at(0.0, 0.0), at(0.0, 20.0))),
            FrameRecord::new(1, at(0.0, 30.0))
                .with_line("0", Segment::new(at(0.0, 20.0), at(0.0, 40.0))),
            FrameRecord::new(2, at(0.0, 40.0))
                .with_line("0", Segment::new(at(0.0, 20.0), at(0.0, 60.0))),
        ];
        let ctx = run(&frames);

        assert_eq!(ctx.chains().len(), 1);
        assert_eq!(ctx.stats().redirects, 0);
        assert!(ctx.chain(ChainId(0)).points().windows(2).all(|w| distance(&w[0], &w[1]) >= 3.5));
    }
}
