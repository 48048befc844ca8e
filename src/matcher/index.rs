//! R-tree over camera positions for the candidate radius search.
//!
//! The tree stores `[lat, lon]` in degrees. A query first collects every camera inside a
//! degree-space envelope that is guaranteed to contain the search circle, then applies the
//! exact flat-Earth distance test, so the result is the same set a full scan would return.

use rstar::{primitives::GeomWithData, RTree, AABB};

use crate::geo::{distance, GeoPoint, METERS_PER_DEGREE};

type IndexedCamera = GeomWithData<[f64; 2], usize>;

/// Widening applied to the envelope half-widths.
const ENVELOPE_MARGIN: f64 = 1.01;

/// Below this cosine the longitude span is unbounded (search circle touches a pole).
const MIN_COS_LATITUDE: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct CameraIndex {
    tree: RTree<IndexedCamera>,
    cameras: Vec<GeoPoint>,
}

impl CameraIndex {
    /// Bulk-loads cameras; each camera's position in the iterator is its frame ordinal.
    pub fn new(cameras: impl IntoIterator<Item = GeoPoint>) -> Self {
        let cameras: Vec<GeoPoint> = cameras.into_iter().collect();
        let indexed = cameras
            .iter()
            .enumerate()
            .map(|(ordinal, camera)| GeomWithData::new([camera.lat(), camera.lon()], ordinal))
            .collect();

        Self {
            tree: RTree::bulk_load(indexed),
            cameras,
        }
    }

    pub fn len(&self) -> usize {
        self.cameras.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cameras.is_empty()
    }

    /// Ordinals greater than `after` whose camera satisfies `distance(query, camera) < radius`,
    /// in ascending order.
    pub fn within_radius(&self, query: &GeoPoint, radius: f64, after: usize) -> Vec<usize> {
        let mut ordinals: Vec<usize> = self
            .tree
            .locate_in_envelope(&search_envelope(query, radius))
            .map(|entry| entry.data)
            .filter(|&ordinal| ordinal > after)
            .filter(|&ordinal| distance(query, &self.cameras[ordinal]) < radius)
            .collect();
        ordinals.sort_unstable();
        ordinals
    }
}

/// Degree-space box containing every camera that can pass the radius test.
///
/// The latitude term alone bounds `|dlat| < radius / M`. The longitude term is scaled by
/// the camera's own latitude, which is at most `|lat| + dlat` away from the equator, so the
/// smallest cosine in that band bounds `|dlon|`.
fn search_envelope(query: &GeoPoint, radius: f64) -> AABB<[f64; 2]> {
    let half_lat = radius / METERS_PER_DEGREE * ENVELOPE_MARGIN;
    let edge_lat = (query.lat().abs() + half_lat).min(90.0);
    let cos_edge = edge_lat.to_radians().cos();
    let half_lon = if cos_edge > MIN_COS_LATITUDE {
        radius / (METERS_PER_DEGREE * cos_edge) * ENVELOPE_MARGIN
    } else {
        360.0
    };

    AABB::from_corners(
        [query.lat() - half_lat, query.lon() - half_lon],
        [query.lat() + half_lat, query.lon() + half_lon],
    )
}
