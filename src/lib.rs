//! Stitches per-frame lane-stripe detections into long geographic polylines.
//!
//! Every frame carries a camera position and a set of line segments already projected to
//! latitude/longitude. Segment points are weighted by their distance to the camera, matched
//! against later frames, fused, and appended to chains; chains shorter than a threshold are
//! dropped and the rest are written out as KML line strings.
//!
//! ```no_run
//! use std::path::Path;
//!
//! use lane_stitch::{stitch_file, StitchConfig};
//!
//! let config = StitchConfig::default();
//! let stitched = stitch_file(Path::new("frames.json"), &config)?;
//! stitched.to_kml(&config.style).save(Path::new("lines.kml"))?;
//! # Ok::<(), lane_stitch::Error>(())
//! ```

pub mod chain;
pub mod config;
mod error;
pub mod frame;
pub mod geo;
pub mod kml;
pub mod matcher;
pub mod math;
pub mod sampling;

use std::borrow::Cow;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::info;

use chain::{finalize, ChainAssigner, StitchedLine};
use kml::{KmlDocument, LineStyle};
use matcher::Matcher;
use sampling::{PointTable, Sampler};

pub use config::StitchConfig;
pub use error::Error;
pub use frame::{FrameRecord, Segment};
pub use geo::GeoPoint;

/// Counters of one stitching run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StitchReport {
    pub frames: usize,
    pub lines: usize,
    pub chains_created: usize,
    pub chains_kept: usize,
    pub redirects: usize,
    pub appends: usize,
    pub suppressed_appends: usize,
}

/// Output of a run: the kept lines in chain id order.
#[derive(Debug, Clone, PartialEq)]
pub struct Stitched {
    pub lines: Vec<StitchedLine>,
    pub report: StitchReport,
}

impl Stitched {
    pub fn to_kml(&self, style: &LineStyle) -> KmlDocument {
        KmlDocument::from_lines(&self.lines, style)
    }
}

/// Runs the full pass over `frames`.
///
/// Frames are processed in ascending frame number; input that is not already sorted is
/// stable-sorted first. Each call starts from an empty chain state.
pub fn stitch_frames(frames: &[FrameRecord], config: &StitchConfig) -> Result<Stitched, Error> {
    config.validate()?;
    for frame in frames {
        frame.validate()?;
    }

    let frames: Cow<[FrameRecord]> = if frames
        .windows(2)
        .all(|w| w[0].frame_number <= w[1].frame_number)
    {
        Cow::Borrowed(frames)
    } else {
        Cow::Owned(frame::order_frames(frames.to_vec()))
    };

    let sampler = Sampler::from_config(config);
    let table = PointTable::build(&frames, &sampler, config.parallel_sampling);
    let matcher = Matcher::new(&table, config);
    let ctx = ChainAssigner::new(sampler, &matcher, config.min_append_distance).run(&frames);

    let stats = ctx.stats();
    let chains = ctx.into_chains();
    let chains_created = chains.len();
    let lines = finalize(chains, config.min_chain_length);

    let report = StitchReport {
        frames: frames.len(),
        lines: stats.lines,
        chains_created,
        chains_kept: lines.len(),
        redirects: stats.redirects,
        appends: stats.appends,
        suppressed_appends: stats.suppressed_appends,
    };
    info!(
        "stitched {} lines from {} frames into {} chains, kept {} ({} redirects)",
        report.lines, report.frames, report.chains_created, report.chains_kept, report.redirects
    );

    Ok(Stitched { lines, report })
}

/// Loads frames from a JSON file and stitches them.
pub fn stitch_file(path: &Path, config: &StitchConfig) -> Result<Stitched, Error> {
    let frames = frame::read_frames(BufReader::new(File::open(path)?))?;
    stitch_frames(&frames, config)
}
