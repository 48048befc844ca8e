pub mod fusion;

pub use fusion::{fuse, fuse_from, FusionError, Observation};
