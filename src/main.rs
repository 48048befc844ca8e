//! Command-line front end: frames JSON in, stitched lines KML out.
//!
//! Usage:
//!   lane-stitch frames.json -o lines.kml
//!   lane-stitch frames.json -o lines.kml --config stitch.yaml --raw-kml raw.kml
//!
//! Per-frame progress is logged at debug level:
//!   RUST_LOG=debug lane-stitch frames.json -o lines.kml

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use env_logger::Env;
use log::info;

use lane_stitch::frame::read_frames;
use lane_stitch::kml::KmlDocument;
use lane_stitch::{stitch_frames, StitchConfig};

/// Stitch per-frame lane-line detections into continuous polylines
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON array of frames with camera position and geographic line segments
    input: PathBuf,

    /// Output KML file for the stitched lines
    #[arg(short, long)]
    output: PathBuf,

    /// YAML file overriding the default tuning
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write every input segment and camera position to this KML file
    #[arg(long)]
    raw_kml: Option<PathBuf>,

    /// Minimum length (meters) of an output line
    #[arg(long)]
    min_length: Option<f64>,

    /// Maximum distance (meters) between a point and a matched detection
    #[arg(long)]
    merge_threshold: Option<f64>,

    /// Camera search radius (meters) for continuation candidates
    #[arg(long)]
    search_radius: Option<f64>,

    /// Sample frames on the current thread only
    #[arg(long)]
    sequential: bool,
}

impl Args {
    fn stitch_config(&self) -> Result<StitchConfig> {
        let mut config = match &self.config {
            Some(path) => StitchConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => StitchConfig::default(),
        };
        if let Some(length) = self.min_length {
            config = config.with_min_chain_length(length);
        }
        if let Some(threshold) = self.merge_threshold {
            config = config.with_merge_threshold(threshold);
        }
        if let Some(radius) = self.search_radius {
            config = config.with_search_radius(radius);
        }
        if self.sequential {
            config = config.with_parallel_sampling(false);
        }
        config.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = args.stitch_config()?;

    let file = std::fs::File::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let frames = read_frames(std::io::BufReader::new(file))
        .with_context(|| format!("reading frames from {}", args.input.display()))?;

    if let Some(path) = &args.raw_kml {
        KmlDocument::raw_detections(&frames)
            .save(path)
            .with_context(|| format!("writing {}", path.display()))?;
        info!("wrote raw detections to {}", path.display());
    }

    let stitched = stitch_frames(&frames, &config)?;
    stitched
        .to_kml(&config.style)
        .save(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;
    info!(
        "wrote {} lines to {}",
        stitched.lines.len(),
        args.output.display()
    );

    Ok(())
}
