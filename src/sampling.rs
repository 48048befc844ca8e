use rayon::prelude::*;

use crate::config::StitchConfig;
use crate::frame::{FrameRecord, LineKey, Segment};
use crate::geo::{distance, GeoPoint};
use crate::math::Observation;

/// A point generated along a detected segment, with its distance-derived variance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePoint {
    pub position: GeoPoint,
    pub variance: f64,
    /// Frame ordinal and line position the point was sampled from.
    pub key: LineKey,
}

impl SamplePoint {
    pub fn observation(&self) -> Observation {
        Observation::new(self.position, self.variance)
    }
}

/// Turns segments into variance-weighted sample points. Confidence falls off linearly
/// with distance from the camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampler {
    pub samples_per_segment: usize,
    pub variance_per_meter: f64,
    pub min_variance: f64,
}

impl Default for Sampler {
    fn default() -> Self {
        Self::from_config(&StitchConfig::default())
    }
}

impl Sampler {
    pub fn from_config(config: &StitchConfig) -> Self {
        Self {
            samples_per_segment: config.samples_per_segment,
            variance_per_meter: config.variance_per_meter,
            min_variance: config.min_variance,
        }
    }

    /// `variance_per_meter * distance(point, camera)`; a point on the camera itself gets
    /// `min_variance` so that fusion gains stay defined.
    pub fn variance_at(&self, point: &GeoPoint, camera: &GeoPoint) -> f64 {
        let d = distance(point, camera);
        if d == 0.0 {
            self.min_variance
        } else {
            self.variance_per_meter * d
        }
    }

    /// Evenly spaced points from `segment.start` to `segment.end`, both included.
    pub fn sample(&self, segment: &Segment, camera: &GeoPoint, key: LineKey) -> Vec<SamplePoint> {
        let n = self.samples_per_segment;
        let mut points = Vec::with_capacity(n);

        for i in 0..n {
            let t = if n > 1 {
                i as f64 / (n - 1) as f64
            } else {
                0.0
            };
            let position = segment.start.lerp(&segment.end, t);
            points.push(SamplePoint {
                position,
                variance: self.variance_at(&position, camera),
                key,
            });
        }

        points
    }

    /// Single-point form of [Sampler::sample], used for a segment's end point.
    pub fn end_point_with_variance(&self, point: &GeoPoint, camera: &GeoPoint) -> Observation {
        Observation::new(*point, self.variance_at(point, camera))
    }
}

/// Sample points of one frame, grouped per line in the frame's line order.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSamples {
    pub camera: GeoPoint,
    pub lines: Vec<Vec<SamplePoint>>,
}

impl FrameSamples {
    pub fn points(&self) -> impl Iterator<Item = &SamplePoint> {
        self.lines.iter().flatten()
    }
}

/// Read-only snapshot of every frame's sample points, indexed by frame ordinal.
#[derive(Debug, Clone, PartialEq)]
pub struct PointTable {
    frames: Vec<FrameSamples>,
}

impl PointTable {
    /// Samples all frames. Frames are independent at this stage, so with `parallel` set
    /// the work is spread over the rayon pool; the result is identical either way.
    pub fn build(frames: &[FrameRecord], sampler: &Sampler, parallel: bool) -> Self {
        let sample_frame = |(ordinal, frame): (usize, &FrameRecord)| FrameSamples {
            camera: frame.camera,
            lines: frame
                .lines
                .iter()
                .enumerate()
                .map(|(line, (_, segment))| {
                    sampler.sample(segment, &frame.camera, LineKey::new(ordinal, line))
                })
                .collect(),
        };

        let frames: Vec<FrameSamples> = if parallel {
            frames.par_iter().enumerate().map(sample_frame).collect()
        } else {
            frames.iter().enumerate().map(sample_frame).collect()
        };

        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frame(&self, ordinal: usize) -> Option<&FrameSamples> {
        self.frames.get(ordinal)
    }

    pub fn frames(&self) -> &[FrameSamples] {
        &self.frames
    }

    pub fn cameras(&self) -> impl Iterator<Item = GeoPoint> + '_ {
        self.frames.iter().map(|frame| frame.camera)
    }

    pub fn sample_count(&self) -> usize {
        self.frames.iter().map(|frame| frame.points().count()).sum()
    }
}
