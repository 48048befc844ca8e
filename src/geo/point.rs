use core::fmt;
use std::{
    fmt::{Display, Formatter},
    ops::Deref,
};

use nalgebra as na;

use super::distance::METERS_PER_DEGREE;

/// A geographic position in degrees, stored as a [na::Point2] with `x = latitude` and
/// `y = longitude`.
///
/// Arithmetic on positions (interpolation, fusion) is componentwise on latitude and
/// longitude, which is what the flat-Earth approximation used throughout the crate
/// assumes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint(na::Point2<f64>);

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self(na::Point2::new(lat, lon))
    }

    pub fn lat(&self) -> f64 {
        self.0.x
    }

    pub fn lon(&self) -> f64 {
        self.0.y
    }

    pub fn is_finite(&self) -> bool {
        self.0.x.is_finite() && self.0.y.is_finite()
    }

    /// Linear interpolation towards `other`, `start + (end - start) * t` per component.
    pub fn lerp(&self, other: &GeoPoint, t: f64) -> GeoPoint {
        Self(self.0 + (other.0 - self.0) * t)
    }

    /// East/north offset in meters of this point relative to `origin`.
    ///
    /// Uses the same scale factors as [super::distance], so the norm of the result equals
    /// `distance(self, origin)`.
    pub fn to_local(&self, origin: &GeoPoint) -> na::Vector2<f64> {
        let north = (self.lat() - origin.lat()) * METERS_PER_DEGREE;
        let east = (self.lon() - origin.lon()) * METERS_PER_DEGREE * origin.lat().to_radians().cos();
        na::Vector2::new(east, north)
    }

    /// Inverse of [GeoPoint::to_local].
    pub fn from_local(origin: &GeoPoint, offset: &na::Vector2<f64>) -> GeoPoint {
        let lat = origin.lat() + offset.y / METERS_PER_DEGREE;
        let lon =
            origin.lon() + offset.x / (METERS_PER_DEGREE * origin.lat().to_radians().cos());
        GeoPoint::new(lat, lon)
    }
}

impl Display for GeoPoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.lat(), self.lon())
    }
}

impl Deref for GeoPoint {
    type Target = na::Point2<f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<na::Point2<f64>> for GeoPoint {
    fn as_ref(&self) -> &na::Point2<f64> {
        &self.0
    }
}

impl From<[f64; 2]> for GeoPoint {
    fn from([lat, lon]: [f64; 2]) -> Self {
        Self::new(lat, lon)
    }
}

impl From<GeoPoint> for [f64; 2] {
    fn from(value: GeoPoint) -> Self {
        [value.lat(), value.lon()]
    }
}
