use anyhow::Result;
use lane_stitch::{stitch_frames, FrameRecord, GeoPoint, Segment, StitchConfig};
use nalgebra as na;
use rerun as rr;

const ORIGIN: [f64; 2] = [52.0, 4.0];

/// Deterministic jitter in [-amplitude, amplitude].
fn jitter(seed: f64, amplitude: f64) -> f64 {
    (seed * 12.9898).sin() * amplitude
}

fn to_vec2(point: &GeoPoint) -> [f32; 2] {
    let local = point.to_local(&GeoPoint::from(ORIGIN));
    [local.x as f32, local.y as f32]
}

/// A vehicle driving north at 6 m per frame, seeing two stripes 3.5 m apart, each detected
/// as a short, slightly offset segment ahead of the camera.
fn synthesize_drive(frames: usize) -> Vec<FrameRecord> {
    let origin = GeoPoint::from(ORIGIN);
    let at = |east: f64, north: f64| GeoPoint::from_local(&origin, &na::Vector2::new(east, north));

    (0..frames)
        .map(|i| {
            let y = 6.0 * i as f64;
            let mut frame = FrameRecord::new(i as i64, at(0.0, y));
            for (line, east) in [-1.75, 1.75].into_iter().enumerate() {
                let seed = (i * 2 + line) as f64;
                let start = at(east + jitter(seed, 0.15), y + 4.0 + jitter(seed + 0.5, 0.3));
                let end = at(east + jitter(seed + 0.25, 0.15), y + 14.0 + jitter(seed + 0.75, 0.3));
                frame = frame.with_line(line.to_string(), Segment::new(start, end));
            }
            frame
        })
        .collect()
}

fn main() -> Result<()> {
    let rec = rr::RecordingStreamBuilder::new("lane_stitch_chains").spawn()?;

    let frames = synthesize_drive(40);
    let stitched = stitch_frames(&frames, &StitchConfig::default())?;
    println!("{:?}", stitched.report);

    rec.log(
        "cameras",
        &rr::Points2D::new(frames.iter().map(|f| to_vec2(&f.camera)))
            .with_colors([rr::Color::from_rgb(0, 0, 255)])
            .with_radii([0.3]),
    )?;

    rec.log(
        "raw",
        &rr::LineStrips2D::new(frames.iter().flat_map(|f| {
            f.lines
                .iter()
                .map(|(_, s)| vec![to_vec2(&s.start), to_vec2(&s.end)])
        }))
        .with_colors([rr::Color::from_rgb(255, 255, 0)]),
    )?;

    for line in &stitched.lines {
        rec.log(
            format!("chains/{}", line.id),
            &rr::LineStrips2D::new([line.points.iter().map(to_vec2).collect::<Vec<_>>()])
                .with_colors([rr::Color::from_rgb(255, 0, 0)])
                .with_labels([format!("Line {} ({:.1} m)", line.id, line.length)]),
        )?;
    }

    Ok(())
}
