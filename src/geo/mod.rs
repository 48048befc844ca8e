pub mod distance;
pub mod point;

pub use distance::{distance, path_length, METERS_PER_DEGREE};
pub use point::GeoPoint;
