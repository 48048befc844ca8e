use thiserror::Error;

use crate::geo::GeoPoint;

#[derive(Debug, Error)]
pub enum FusionError {
    #[error("Cannot fuse an empty list of observations")]
    NoObservations,
}

/// A position estimate together with its variance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub position: GeoPoint,
    pub variance: f64,
}

impl Observation {
    pub fn new(position: GeoPoint, variance: f64) -> Self {
        Self { position, variance }
    }

    /// Folds `other` into this estimate.
    ///
    /// With gain `k = v_self / (v_self + v_other)` the position moves by `k` towards
    /// `other` (latitude and longitude independently) and the variance shrinks by `1 - k`.
    pub fn update(&self, other: &Observation) -> Observation {
        let gain = self.variance / (self.variance + other.variance);
        Observation {
            position: self.position.lerp(&other.position, gain),
            variance: self.variance * (1.0 - gain),
        }
    }
}

/// Sequentially fuses `rest` onto `anchor`, in iteration order.
///
/// The result depends on the order of the observations; it is not a batch estimate.
pub fn fuse_from<'a>(
    anchor: Observation,
    rest: impl IntoIterator<Item = &'a Observation>,
) -> Observation {
    rest.into_iter()
        .fold(anchor, |fused, observation| fused.update(observation))
}

/// Fuses an ordered list of observations, the first one acting as the initial estimate.
pub fn fuse(observations: &[Observation]) -> Result<Observation, FusionError> {
    let (first, rest) = observations
        .split_first()
        .ok_or(FusionError::NoObservations)?;
    Ok(fuse_from(*first, rest))
}
