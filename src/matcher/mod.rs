//! Forward-in-time continuation search.
//!
//! For a query point observed in frame `f`, every later frame whose camera lies within the
//! search radius contributes at most one candidate: its sample point closest to the query,
//! kept only if it is within the merge threshold.

pub mod index;

pub use index::CameraIndex;

use crate::config::StitchConfig;
use crate::geo::{distance, GeoPoint};
use crate::sampling::{PointTable, SamplePoint};

pub struct Matcher<'a> {
    table: &'a PointTable,
    index: CameraIndex,
    search_radius: f64,
    merge_threshold: f64,
}

impl<'a> Matcher<'a> {
    pub fn new(table: &'a PointTable, config: &StitchConfig) -> Self {
        Self::with_thresholds(table, config.search_radius, config.merge_threshold)
    }

    pub fn with_thresholds(table: &'a PointTable, search_radius: f64, merge_threshold: f64) -> Self {
        Self {
            table,
            index: CameraIndex::new(table.cameras()),
            search_radius,
            merge_threshold,
        }
    }

    /// Accepted candidates for `query` from frames strictly after `frame`, in ascending
    /// frame order. An empty result is normal: the stripe ended or was not seen.
    pub fn find_candidates(&self, query: &GeoPoint, frame: usize) -> Vec<SamplePoint> {
        self.frames_within_radius(query, frame)
            .into_iter()
            .filter_map(|ordinal| self.closest_in_frame(ordinal, query))
            .filter(|candidate| distance(query, &candidate.position) < self.merge_threshold)
            .collect()
    }

    /// Forward frames whose camera is within the search radius, via the R-tree.
    pub fn frames_within_radius(&self, query: &GeoPoint, frame: usize) -> Vec<usize> {
        self.index.within_radius(query, self.search_radius, frame)
    }

    /// Same selection as [Matcher::frames_within_radius] by scanning every frame.
    pub fn scan_frames_brute_force(&self, query: &GeoPoint, frame: usize) -> Vec<usize> {
        self.table
            .frames()
            .iter()
            .enumerate()
            .skip(frame + 1)
            .filter(|(_, samples)| distance(query, &samples.camera) < self.search_radius)
            .map(|(ordinal, _)| ordinal)
            .collect()
    }

    /// The frame's sample point nearest to `query` over all of its lines. Ties go to the
    /// point listed first.
    fn closest_in_frame(&self, ordinal: usize, query: &GeoPoint) -> Option<SamplePoint> {
        let mut best: Option<(f64, &SamplePoint)> = None;
        for point in self.table.frame(ordinal)?.points() {
            let d = distance(&point.position, query);
            if best.map_or(true, |(best_d, _)| d < best_d) {
                best = Some((d, point));
            }
        }
        best.map(|(_, point)| *point)
    }
}
