use itertools::Itertools;

use super::GeoPoint;

/// Meters per degree of latitude (and of longitude at the equator).
pub const METERS_PER_DEGREE: f64 = 111_320.0;

/// Flat-Earth (equirectangular) distance in meters.
///
/// The longitude scale is taken at the latitude of `reference`, so the function is not
/// exactly symmetric. Callers pass the anchor of the comparison (camera, query point,
/// candidate) as `reference`.
pub fn distance(point: &GeoPoint, reference: &GeoPoint) -> f64 {
    let lat_distance = (point.lat() - reference.lat()) * METERS_PER_DEGREE;
    let lon_distance =
        (point.lon() - reference.lon()) * (METERS_PER_DEGREE * reference.lat().to_radians().cos());
    (lat_distance * lat_distance + lon_distance * lon_distance).sqrt()
}

/// Arc length of a polyline: the sum of `distance(p[i], p[i + 1])`.
pub fn path_length(points: &[GeoPoint]) -> f64 {
    points
        .iter()
        .tuple_windows()
        .map(|(a, b)| distance(a, b))
        .sum()
}
