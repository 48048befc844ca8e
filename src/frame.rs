use std::fmt::{self, Display, Formatter};
use std::io::Read;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::geo::GeoPoint;

/// Identifier of a detected line inside one frame, as produced by the upstream projector.
pub type LineId = String;

/// Which end of a segment a record error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Start,
    End,
}

impl Display for Endpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Start => f.write_str("start"),
            Endpoint::End => f.write_str("end"),
        }
    }
}

/// A malformed input record. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("frame at input position {position} has no frame number")]
    MissingFrameNumber { position: usize },

    #[error("frame {frame} has no camera position")]
    MissingCameraPosition { frame: i64 },

    #[error("frame {frame}, line {line}: missing {endpoint} point")]
    MissingEndpoint {
        frame: i64,
        line: LineId,
        endpoint: Endpoint,
    },

    #[error("frame {frame}{}: invalid {field}: {reason}", line_suffix(.line))]
    InvalidCoordinate {
        frame: i64,
        line: Option<LineId>,
        field: &'static str,
        reason: &'static str,
    },

    #[error("frame {frame}: lines must map line ids to segments")]
    InvalidLines { frame: i64 },

    #[error("frame {frame}, line {line}: segment must be an object with start and end")]
    InvalidSegment { frame: i64, line: LineId },
}

fn line_suffix(line: &Option<LineId>) -> String {
    line.as_ref()
        .map(|l| format!(", line {l}"))
        .unwrap_or_default()
}

/// A per-frame partial detection of a physical stripe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start: GeoPoint,
    pub end: GeoPoint,
}

impl Segment {
    pub fn new(start: GeoPoint, end: GeoPoint) -> Self {
        Self { start, end }
    }
}

/// One sampled instant: camera position plus the segments detected in it.
///
/// Lines keep the order in which they were listed; that order is the iteration order of
/// the chain assignment pass.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub frame_number: i64,
    pub camera: GeoPoint,
    pub lines: Vec<(LineId, Segment)>,
}

impl FrameRecord {
    pub fn new(frame_number: i64, camera: GeoPoint) -> Self {
        Self {
            frame_number,
            camera,
            lines: Vec::new(),
        }
    }

    /// Builder-style line insertion. A repeated id replaces the earlier segment in place.
    pub fn with_line(mut self, id: impl Into<LineId>, segment: Segment) -> Self {
        self.insert_line(id.into(), segment);
        self
    }

    pub fn insert_line(&mut self, id: LineId, segment: Segment) {
        match self.lines.iter_mut().find(|(existing, _)| *existing == id) {
            Some((_, slot)) => *slot = segment,
            None => self.lines.push((id, segment)),
        }
    }

    pub fn segment(&self, id: &str) -> Option<&Segment> {
        self.lines
            .iter()
            .find(|(line_id, _)| line_id == id)
            .map(|(_, segment)| segment)
    }

    /// Rejects non-finite coordinates, naming the offending frame and line.
    pub fn validate(&self) -> Result<(), RecordError> {
        if !self.camera.is_finite() {
            return Err(RecordError::InvalidCoordinate {
                frame: self.frame_number,
                line: None,
                field: "camera position",
                reason: "non-finite component",
            });
        }
        for (id, segment) in &self.lines {
            for (endpoint, point) in [(Endpoint::Start, segment.start), (Endpoint::End, segment.end)]
            {
                if !point.is_finite() {
                    return Err(RecordError::InvalidCoordinate {
                        frame: self.frame_number,
                        line: Some(id.clone()),
                        field: endpoint_field(endpoint),
                        reason: "non-finite component",
                    });
                }
            }
        }
        Ok(())
    }
}

fn endpoint_field(endpoint: Endpoint) -> &'static str {
    match endpoint {
        Endpoint::Start => "start point",
        Endpoint::End => "end point",
    }
}

/// Addresses one line of one frame. `frame` is the frame's ordinal in processing order and
/// `line` the line's position inside that frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineKey {
    pub frame: usize,
    pub line: usize,
}

impl LineKey {
    pub fn new(frame: usize, line: usize) -> Self {
        Self { frame, line }
    }
}

impl Display for LineKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.frame, self.line)
    }
}

/// Frame object as written by the projector. Every field is optional here so that a
/// missing value becomes a [RecordError] naming the frame instead of a bare parse error.
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default, alias = "framenumber")]
    frame_number: Option<i64>,
    #[serde(default, alias = "coords")]
    camera: Option<Value>,
    #[serde(default, alias = "lines_pixel_on_top_view")]
    lines: Option<Value>,
}

impl RawFrame {
    fn into_record(self, position: usize) -> Result<FrameRecord, RecordError> {
        let frame = self
            .frame_number
            .ok_or(RecordError::MissingFrameNumber { position })?;

        let camera = self
            .camera
            .filter(|v| !v.is_null())
            .ok_or(RecordError::MissingCameraPosition { frame })?;
        let camera = parse_coordinate(&camera).map_err(|reason| RecordError::InvalidCoordinate {
            frame,
            line: None,
            field: "camera position",
            reason,
        })?;

        let mut record = FrameRecord::new(frame, camera);
        let lines = match self.lines {
            None | Some(Value::Null) => return Ok(record),
            Some(Value::Object(map)) => map,
            Some(_) => return Err(RecordError::InvalidLines { frame }),
        };

        for (line, value) in lines {
            let segment = value.as_object().ok_or_else(|| RecordError::InvalidSegment {
                frame,
                line: line.clone(),
            })?;
            let endpoint = |which: Endpoint| -> Result<GeoPoint, RecordError> {
                let key = match which {
                    Endpoint::Start => "start",
                    Endpoint::End => "end",
                };
                let value = segment
                    .get(key)
                    .filter(|v| !v.is_null())
                    .ok_or_else(|| RecordError::MissingEndpoint {
                        frame,
                        line: line.clone(),
                        endpoint: which,
                    })?;
                parse_coordinate(value).map_err(|reason| RecordError::InvalidCoordinate {
                    frame,
                    line: Some(line.clone()),
                    field: endpoint_field(which),
                    reason,
                })
            };
            let segment = Segment::new(endpoint(Endpoint::Start)?, endpoint(Endpoint::End)?);
            record.insert_line(line, segment);
        }

        Ok(record)
    }
}

fn parse_coordinate(value: &Value) -> Result<GeoPoint, &'static str> {
    let pair = value.as_array().ok_or("expected a [lat, lon] array")?;
    if pair.len() != 2 {
        return Err("expected exactly two components");
    }
    let lat = pair[0].as_f64().ok_or("latitude is not a number")?;
    let lon = pair[1].as_f64().ok_or("longitude is not a number")?;
    let point = GeoPoint::new(lat, lon);
    if !point.is_finite() {
        return Err("non-finite component");
    }
    Ok(point)
}

/// Parses a JSON array of frame objects into records ordered by frame number.
///
/// The sort is stable: frames sharing a frame number keep their input order.
pub fn parse_frames(json: &str) -> Result<Vec<FrameRecord>, crate::Error> {
    let raw: Vec<RawFrame> = serde_json::from_str(json)?;
    into_ordered_records(raw)
}

/// Reader counterpart of [parse_frames].
pub fn read_frames<R: Read>(reader: R) -> Result<Vec<FrameRecord>, crate::Error> {
    let raw: Vec<RawFrame> = serde_json::from_reader(reader)?;
    into_ordered_records(raw)
}

fn into_ordered_records(raw: Vec<RawFrame>) -> Result<Vec<FrameRecord>, crate::Error> {
    let records: Vec<FrameRecord> = raw
        .into_iter()
        .enumerate()
        .map(|(position, frame)| frame.into_record(position))
        .collect::<Result<_, _>>()?;
    Ok(order_frames(records))
}

/// Stable sort by frame number.
pub fn order_frames(mut frames: Vec<FrameRecord>) -> Vec<FrameRecord> {
    frames.sort_by_key(|frame| frame.frame_number);
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use anyhow::Result;

    const TWO_FRAMES: &str = r#"[
        {
            "framenumber": 7,
            "coords": [52.0, 4.0],
            "lines_pixel_on_top_view": {
                "3": {"start": [52.0001, 4.0], "end": [52.0002, 4.0]},
                "1": {"start": [52.0001, 4.0001], "end": [52.0002, 4.0001]}
            }
        },
        {
            "frame_number": 2,
            "camera": [51.9999, 4.0],
            "lines": {}
        }
    ]"#;

    #[test]
    fn test_parse_orders_frames_and_keeps_line_order() -> Result<()> {
        let frames = parse_frames(TWO_FRAMES)?;

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].frame_number, 2);
        assert_eq!(frames[1].frame_number, 7);

        let ids: Vec<&str> = frames[1].lines.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, ["3", "1"]);
        assert_eq!(
            frames[1].segment("1").map(|s| s.end),
            Some(GeoPoint::new(52.0002, 4.0001))
        );
        Ok(())
    }

    #[test]
    fn test_duplicate_frame_numbers_keep_input_order() -> Result<()> {
        let json = r#"[
            {"framenumber": 1, "coords": [1.0, 1.0]},
            {"framenumber": 0, "coords": [0.0, 0.0]},
            {"framenumber": 1, "coords": [2.0, 2.0]}
        ]"#;
        let frames = parse_frames(json)?;
        let cameras: Vec<f64> = frames.iter().map(|f| f.camera.lat()).collect();
        assert_eq!(cameras, [0.0, 1.0, 2.0]);
        Ok(())
    }

    #[test]
    fn test_missing_lines_is_empty_frame() -> Result<()> {
        let frames = parse_frames(r#"[{"framenumber": 0, "coords": [1.0, 2.0]}]"#)?;
        assert!(frames[0].lines.is_empty());
        assert!(parse_frames("[]")?.is_empty());
        Ok(())
    }

    #[test]
    fn test_missing_camera() {
        let err = parse_frames(r#"[{"framenumber": 4, "lines": {}}]"#).unwrap_err();
        assert!(matches!(
            err,
            Error::Record(RecordError::MissingCameraPosition { frame: 4 })
        ));
    }

    #[test]
    fn test_missing_endpoint_names_frame_and_line() {
        let json = r#"[{"framenumber": 9, "coords": [1.0, 2.0],
            "lines": {"a": {"start": [1.0, 2.0]}}}]"#;
        let err = parse_frames(json).unwrap_err();
        match err {
            Error::Record(RecordError::MissingEndpoint {
                frame,
                line,
                endpoint,
            }) => {
                assert_eq!(frame, 9);
                assert_eq!(line, "a");
                assert_eq!(endpoint, Endpoint::End);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            parse_frames(json).unwrap_err().to_string(),
            "frame 9, line a: missing end point"
        );
    }

    #[test]
    fn test_malformed_coordinate() {
        let json = r#"[{"framenumber": 3, "coords": [1.0, 2.0],
            "lines": {"x": {"start": [1.0], "end": [1.0, 2.0]}}}]"#;
        let err = parse_frames(json).unwrap_err();
        assert_eq!(
            err.to_string(),
            "frame 3, line x: invalid start point: expected exactly two components"
        );

        let json = r#"[{"framenumber": 3, "coords": "north"}]"#;
        let err = parse_frames(json).unwrap_err();
        assert_eq!(
            err.to_string(),
            "frame 3: invalid camera position: expected a [lat, lon] array"
        );
    }

    #[test]
    fn test_missing_frame_number() {
        let err = parse_frames(r#"[{"coords": [1.0, 2.0]}]"#).unwrap_err();
        assert!(matches!(
            err,
            Error::Record(RecordError::MissingFrameNumber { position: 0 })
        ));
    }

    #[test]
    fn test_not_json() {
        let err = parse_frames("{ not json").unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn test_validate_rejects_non_finite() {
        let frame = FrameRecord::new(5, GeoPoint::new(1.0, 1.0)).with_line(
            "7",
            Segment::new(GeoPoint::new(f64::NAN, 1.0), GeoPoint::new(1.0, 1.0)),
        );
        let err = frame.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "frame 5, line 7: invalid start point: non-finite component"
        );
    }

    #[test]
    fn test_with_line_replaces_duplicate_id() {
        let a = Segment::new(GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 0.0));
        let b = Segment::new(GeoPoint::new(0.0, 1.0), GeoPoint::new(1.0, 1.0));
        let frame = FrameRecord::new(0, GeoPoint::new(0.0, 0.0))
            .with_line("l", a)
            .with_line("m", a)
            .with_line("l", b);
        assert_eq!(frame.lines.len(), 2);
        assert_eq!(frame.lines[0], ("l".to_string(), b));
    }
}
