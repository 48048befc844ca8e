use log::debug;

use super::{Chain, ChainId};
use crate::geo::GeoPoint;

/// A chain that survived finalization.
#[derive(Debug, Clone, PartialEq)]
pub struct StitchedLine {
    pub id: ChainId,
    pub points: Vec<GeoPoint>,
    /// Arc length in meters.
    pub length: f64,
}

/// Keeps chains whose arc length is at least `min_length` meters, in chain id order.
pub fn finalize(chains: impl IntoIterator<Item = Chain>, min_length: f64) -> Vec<StitchedLine> {
    chains
        .into_iter()
        .filter_map(|chain| {
            let length = chain.length();
            if length >= min_length {
                Some(StitchedLine {
                    id: chain.id(),
                    points: chain.into_points(),
                    length,
                })
            } else {
                debug!(
                    "dropping chain {} ({} points, {length:.2} m)",
                    chain.id(),
                    chain.len()
                );
                None
            }
        })
        .collect()
}
