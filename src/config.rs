//! Tunable constants of the stitching pass.
//!
//! Every field has a default, so a YAML file only needs to list what it changes:
//!
//! ```yaml
//! merge_threshold: 1.5
//! min_chain_length: 20.0
//! style:
//!   width: 3.0
//!   color: ff00ffff
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kml::LineStyle;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for '{field}': {value} ({reason})")]
    InvalidValue {
        field: &'static str,
        value: f64,
        reason: &'static str,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StitchConfig {
    /// Points generated along every detected segment, endpoints included.
    /// Default: 50
    pub samples_per_segment: usize,

    /// Variance per meter of distance between a point and the observing camera.
    /// Default: 0.1
    pub variance_per_meter: f64,

    /// Variance assigned to a point that coincides with the camera position.
    /// Default: 1e-9
    pub min_variance: f64,

    /// Frames whose camera lies within this distance (meters) of a query point are
    /// searched for continuation candidates.
    /// Default: 50.0
    pub search_radius: f64,

    /// A candidate is accepted only when closer than this (meters) to the query point.
    /// Default: 1.1
    pub merge_threshold: f64,

    /// A fused point is appended to a chain only if at least this far (meters) from the
    /// chain's last point.
    /// Default: 3.5
    pub min_append_distance: f64,

    /// Chains shorter than this arc length (meters) are dropped from the output.
    /// Default: 15.0
    pub min_chain_length: f64,

    /// Sample frames on the rayon thread pool.
    /// Default: true
    pub parallel_sampling: bool,

    /// Style of the emitted polylines.
    pub style: LineStyle,
}

impl Default for StitchConfig {
    fn default() -> Self {
        Self {
            samples_per_segment: 50,
            variance_per_meter: 0.1,
            min_variance: 1e-9,
            search_radius: 50.0,
            merge_threshold: 1.1,
            min_append_distance: 3.5,
            min_chain_length: 15.0,
            parallel_sampling: true,
            style: LineStyle::default(),
        }
    }
}

impl StitchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and validate a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_samples_per_segment(mut self, count: usize) -> Self {
        self.samples_per_segment = count;
        self
    }

    pub fn with_variance_per_meter(mut self, k: f64) -> Self {
        self.variance_per_meter = k;
        self
    }

    pub fn with_search_radius(mut self, radius: f64) -> Self {
        self.search_radius = radius;
        self
    }

    pub fn with_merge_threshold(mut self, threshold: f64) -> Self {
        self.merge_threshold = threshold;
        self
    }

    pub fn with_min_append_distance(mut self, distance: f64) -> Self {
        self.min_append_distance = distance;
        self
    }

    pub fn with_min_chain_length(mut self, length: f64) -> Self {
        self.min_chain_length = length;
        self
    }

    pub fn with_parallel_sampling(mut self, parallel: bool) -> Self {
        self.parallel_sampling = parallel;
        self
    }

    pub fn with_style(mut self, style: LineStyle) -> Self {
        self.style = style;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.samples_per_segment == 0 {
            return Err(ConfigError::InvalidValue {
                field: "samples_per_segment",
                value: 0.0,
                reason: "at least one sample is required",
            });
        }
        positive("variance_per_meter", self.variance_per_meter)?;
        positive("min_variance", self.min_variance)?;
        positive("search_radius", self.search_radius)?;
        positive("merge_threshold", self.merge_threshold)?;
        non_negative("min_append_distance", self.min_append_distance)?;
        non_negative("min_chain_length", self.min_chain_length)?;
        positive("style.width", self.style.width)?;
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            value,
            reason: "must be finite and positive",
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            field,
            value,
            reason: "must be finite and non-negative",
        })
    }
}
