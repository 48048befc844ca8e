//! Minimal KML 2.2 writer for the stitched polylines and for raw detections.

use core::fmt;
use std::fmt::{Display, Formatter};
use std::io::{self, Write};
use std::path::Path;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chain::StitchedLine;
use crate::frame::FrameRecord;
use crate::geo::GeoPoint;

#[derive(Debug, Error)]
pub enum KmlColorError {
    #[error("Expected 8 hex digits (aabbggrr), got '{0}'")]
    InvalidHex(String),
}

/// Color in KML's `aabbggrr` byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KmlColor {
    pub alpha: u8,
    pub blue: u8,
    pub green: u8,
    pub red: u8,
}

impl KmlColor {
    pub const RED: KmlColor = KmlColor::rgb(255, 0, 0);
    pub const YELLOW: KmlColor = KmlColor::rgb(255, 255, 0);

    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Self {
            alpha: 255,
            blue,
            green,
            red,
        }
    }
}

impl Display for KmlColor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}",
            self.alpha, self.blue, self.green, self.red
        )
    }
}

impl TryFrom<String> for KmlColor {
    type Error = KmlColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let invalid = || KmlColorError::InvalidHex(value.clone());
        if value.len() != 8 || !value.is_ascii() {
            return Err(invalid());
        }
        let byte = |i: usize| u8::from_str_radix(&value[2 * i..2 * i + 2], 16).map_err(|_| invalid());
        Ok(Self {
            alpha: byte(0)?,
            blue: byte(1)?,
            green: byte(2)?,
            red: byte(3)?,
        })
    }
}

impl From<KmlColor> for String {
    fn from(value: KmlColor) -> Self {
        value.to_string()
    }
}

/// Visual style shared by every emitted line string.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineStyle {
    pub width: f64,
    pub color: KmlColor,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            width: 2.0,
            color: KmlColor::RED,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(GeoPoint),
    LineString(Vec<GeoPoint>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Placemark {
    pub name: String,
    pub style: Option<LineStyle>,
    pub geometry: Geometry,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KmlDocument {
    pub name: Option<String>,
    pub placemarks: Vec<Placemark>,
}

impl KmlDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            placemarks: Vec::new(),
        }
    }

    pub fn push(&mut self, placemark: Placemark) {
        self.placemarks.push(placemark);
    }

    pub fn is_empty(&self) -> bool {
        self.placemarks.is_empty()
    }

    /// One line string per stitched line, labelled `Line <id>`.
    pub fn from_lines(lines: &[StitchedLine], style: &LineStyle) -> Self {
        let mut doc = Self::new("Stitched lane lines");
        for line in lines {
            doc.push(Placemark {
                name: format!("Line {}", line.id),
                style: Some(*style),
                geometry: Geometry::LineString(line.points.clone()),
            });
        }
        doc
    }

    /// The unstitched input: every segment as a thin yellow two-point line, and every
    /// camera position as a point.
    pub fn raw_detections(frames: &[FrameRecord]) -> Self {
        let style = LineStyle {
            width: 1.0,
            color: KmlColor::YELLOW,
        };
        let mut doc = Self::new("Raw detections");
        for frame in frames {
            doc.push(Placemark {
                name: format!("Camera {}", frame.frame_number),
                style: None,
                geometry: Geometry::Point(frame.camera),
            });
            for (id, segment) in &frame.lines {
                doc.push(Placemark {
                    name: format!("Frame {} line {}", frame.frame_number, id),
                    style: Some(style),
                    geometry: Geometry::LineString(vec![segment.start, segment.end]),
                });
            }
        }
        doc
    }

    pub fn write_to<W: Write>(&self, mut writer: W) -> io::Result<()> {
        write!(writer, "{self}")?;
        writer.flush()
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        let file = std::fs::File::create(path)?;
        self.write_to(io::BufWriter::new(file))
    }
}

impl Display for KmlDocument {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
        writeln!(f, r#"<kml xmlns="http://www.opengis.net/kml/2.2">"#)?;
        writeln!(f, "<Document>")?;
        if let Some(name) = &self.name {
            writeln!(f, "  <name>{}</name>", escape(name))?;
        }
        for placemark in &self.placemarks {
            write_placemark(f, placemark)?;
        }
        writeln!(f, "</Document>")?;
        writeln!(f, "</kml>")
    }
}

fn write_placemark(f: &mut Formatter<'_>, placemark: &Placemark) -> fmt::Result {
    writeln!(f, "  <Placemark>")?;
    writeln!(f, "    <name>{}</name>", escape(&placemark.name))?;
    if let Some(style) = &placemark.style {
        writeln!(
            f,
            "    <Style><LineStyle><color>{}</color><width>{}</width></LineStyle></Style>",
            style.color, style.width
        )?;
    }
    match &placemark.geometry {
        Geometry::Point(point) => {
            writeln!(
                f,
                "    <Point><coordinates>{}</coordinates></Point>",
                coordinate(point)
            )?;
        }
        Geometry::LineString(points) => {
            writeln!(
                f,
                "    <LineString><coordinates>{}</coordinates></LineString>",
                points.iter().map(coordinate).join(" ")
            )?;
        }
    }
    writeln!(f, "  </Placemark>")
}

// KML orders coordinates longitude first.
fn coordinate(point: &GeoPoint) -> String {
    format!("{},{},0", point.lon(), point.lat())
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::ChainId;
    use crate::frame::Segment;
    use anyhow::Result;

    #[test]
    fn test_color_hex() -> Result<()> {
        assert_eq!(KmlColor::RED.to_string(), "ff0000ff");
        assert_eq!(KmlColor::YELLOW.to_string(), "ff00ffff");
        assert_eq!(KmlColor::try_from("80ff0000".to_string())?, KmlColor {
            alpha: 0x80,
            blue: 0xff,
            green: 0,
            red: 0,
        });
        assert!(KmlColor::try_from("red".to_string()).is_err());
        assert!(KmlColor::try_from("gg0000ff".to_string()).is_err());
        Ok(())
    }

    #[test]
    fn test_line_document() {
        let lines = vec![StitchedLine {
            id: ChainId(3),
            points: vec![GeoPoint::new(52.0, 4.0), GeoPoint::new(52.5, 4.25)],
            length: 1.0,
        }];
        let kml = KmlDocument::from_lines(&lines, &LineStyle::default()).to_string();

        assert!(kml.starts_with(r#"<?xml version="1.0" encoding="UTF-8"?>"#));
        assert!(kml.contains("<name>Line 3</name>"));
        assert!(kml.contains("<color>ff0000ff</color><width>2</width>"));
        assert!(kml.contains("<coordinates>4,52,0 4.25,52.5,0</coordinates>"));
        assert!(kml.trim_end().ends_with("</kml>"));
    }

    #[test]
    fn test_empty_document_is_valid() {
        let kml = KmlDocument::from_lines(&[], &LineStyle::default()).to_string();
        assert!(kml.contains("<Document>"));
        assert!(!kml.contains("<Placemark>"));
    }

    #[test]
    fn test_raw_detections_escape_ids() {
        let frame = FrameRecord::new(12, GeoPoint::new(1.0, 2.0)).with_line(
            "a<b>&c",
            Segment::new(GeoPoint::new(1.0, 2.0), GeoPoint::new(1.5, 2.5)),
        );
        let doc = KmlDocument::raw_detections(&[frame]);
        assert_eq!(doc.placemarks.len(), 2);

        let kml = doc.to_string();
        assert!(kml.contains("<name>Camera 12</name>"));
        assert!(kml.contains("<Point><coordinates>2,1,0</coordinates></Point>"));
        assert!(kml.contains("<name>Frame 12 line a&lt;b&gt;&amp;c</name>"));
        assert!(kml.contains("<color>ff00ffff</color><width>1</width>"));
    }

    #[test]
    fn test_write_to_buffer() -> Result<()> {
        let doc = KmlDocument::new("empty");
        let mut buffer = Vec::new();
        doc.write_to(&mut buffer)?;
        assert_eq!(String::from_utf8(buffer)?, doc.to_string());
        Ok(())
    }
}
