//! Chains: the multi-frame polylines that per-frame detections are stitched into.

pub mod assigner;
pub mod context;
pub mod finalizer;

pub use assigner::{ChainAssigner, LineOutcome};
pub use context::{AggregationContext, AggregationStats, Claim};
pub use finalizer::{finalize, StitchedLine};

use core::fmt;
use std::fmt::{Display, Formatter};

use crate::geo::{distance, path_length, GeoPoint};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(pub usize);

impl Display for ChainId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Append-only point log of one chain. Never empty: a chain starts from the first
/// segment's start point.
#[derive(Debug, Clone, PartialEq)]
pub struct Chain {
    id: ChainId,
    points: Vec<GeoPoint>,
}

impl Chain {
    pub fn new(id: ChainId, start: GeoPoint) -> Self {
        Self {
            id,
            points: vec![start],
        }
    }

    pub fn id(&self) -> ChainId {
        self.id
    }

    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<GeoPoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn tail(&self) -> &GeoPoint {
        // Constructed with one point and only ever appended to.
        &self.points[self.points.len() - 1]
    }

    /// Appends `point` if it lies at least `min_distance` from the current tail.
    pub fn try_extend(&mut self, point: GeoPoint, min_distance: f64) -> bool {
        if distance(self.tail(), &point) >= min_distance {
            self.points.push(point);
            true
        } else {
            false
        }
    }

    /// Total arc length in meters.
    pub fn length(&self) -> f64 {
        path_length(&self.points)
    }
}
