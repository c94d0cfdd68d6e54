//! Borough-colored boundary rings for the map overlay.
//!
//! Each polygon ring of the boundary file becomes one [`BoundaryShape`];
//! multi-polygons expand ring by ring. Only each feature's `geometry` and
//! `properties` are read; entries whose geometry is missing or malformed are
//! dropped without failing the whole file.

use anyhow::Result;
use geojson::{Feature, Geometry, JsonObject, JsonValue, Value};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::AnalyticsError;

/// Property keys probed for the borough name, highest priority first.
pub static BOROUGH_KEYS: &[&str] = &[
    "borough", "Borough", "BOROUGH", "boro_name", "BoroName", "COUNTY",
];

pub const UNKNOWN_BOROUGH: &str = "Unknown";
pub const FALLBACK_COLOR: &str = "rgba(200,200,200,0.15)";

/// Fill color per borough, in legend order.
pub static BOROUGH_COLORS: &[(&str, &str)] = &[
    ("Manhattan", "rgba(54, 162, 235, 0.25)"),
    ("Brooklyn", "rgba(255, 99, 71, 0.25)"),
    ("Queens", "rgba(255, 206, 86, 0.25)"),
    ("Bronx", "rgba(75, 192, 192, 0.25)"),
    ("Staten Island", "rgba(153, 102, 255, 0.25)"),
];

/// Approximate label anchors: (name, lat, lon).
pub static BOROUGH_LABELS: &[(&str, f64, f64)] = &[
    ("Manhattan", 40.7831, -73.9712),
    ("Brooklyn", 40.65, -73.9496),
    ("Queens", 40.7282, -73.7949),
    ("Bronx", 40.8448, -73.8648),
    ("Staten Island", 40.5795, -74.1502),
];

/// One closed ring, tagged with its borough and fill color.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoundaryShape {
    pub borough: String,
    pub fill_color: &'static str,
    /// `(lon, lat)` pairs in file order.
    pub ring: Vec<(f64, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub borough: &'static str,
    pub color: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoroughLabel {
    pub borough: &'static str,
    pub lat: f64,
    pub lon: f64,
}

/// First non-empty string value among [`BOROUGH_KEYS`], else [`UNKNOWN_BOROUGH`].
pub fn resolve_borough(properties: Option<&JsonObject>) -> String {
    properties
        .and_then(|props| {
            BOROUGH_KEYS
                .iter()
                .filter_map(|key| props.get(*key)?.as_str())
                .find(|name| !name.is_empty())
        })
        .unwrap_or(UNKNOWN_BOROUGH)
        .to_string()
}

pub fn borough_color(borough: &str) -> &'static str {
    BOROUGH_COLORS
        .iter()
        .find(|(name, _)| *name == borough)
        .map_or(FALLBACK_COLOR, |&(_, color)| color)
}

pub fn legend() -> Vec<LegendEntry> {
    BOROUGH_COLORS
        .iter()
        .map(|&(borough, color)| LegendEntry { borough, color })
        .collect()
}

pub fn labels() -> Vec<BoroughLabel> {
    BOROUGH_LABELS
        .iter()
        .map(|&(borough, lat, lon)| BoroughLabel { borough, lat, lon })
        .collect()
}

fn ring_points(ring: &[Vec<f64>]) -> Vec<(f64, f64)> {
    ring.iter()
        .filter_map(|pos| Some((*pos.first()?, *pos.get(1)?)))
        .collect()
}

/// Expands one feature into shapes. Non-polygonal geometries yield nothing.
pub fn classify_feature(feature: &Feature) -> Vec<BoundaryShape> {
    match &feature.geometry {
        Some(geometry) => classify_geometry(geometry, feature.properties.as_ref()),
        None => Vec::new(),
    }
}

/// One shape per polygon ring of `geometry`, colored by the borough named
/// in `properties`.
pub fn classify_geometry(geometry: &Geometry, properties: Option<&JsonObject>) -> Vec<BoundaryShape> {
    let rings: Vec<&Vec<Vec<f64>>> = match &geometry.value {
        Value::Polygon(polygon) => polygon.iter().collect(),
        Value::MultiPolygon(polygons) => polygons.iter().flatten().collect(),
        _ => return Vec::new(),
    };

    let borough = resolve_borough(properties);
    let fill_color = borough_color(&borough);

    rings
        .into_iter()
        .map(|ring| BoundaryShape {
            borough: borough.clone(),
            fill_color,
            ring: ring_points(ring),
        })
        .collect()
}

/// Reads only the `geometry` and `properties` members of a feature entry,
/// ignoring the rest of its envelope. Entries without a parseable geometry
/// yield `None`.
fn classify_entry(entry: JsonValue) -> Option<Vec<BoundaryShape>> {
    let JsonValue::Object(mut entry) = entry else {
        return None;
    };
    let geometry = match entry.remove("geometry") {
        Some(JsonValue::Null) | None => return Some(Vec::new()),
        Some(value) => match Geometry::from_json_value(value) {
            Ok(geometry) => geometry,
            Err(e) => {
                debug!(error = %e, "Skipping boundary feature with malformed geometry");
                return None;
            }
        },
    };
    let properties = entry.get("properties").and_then(JsonValue::as_object);

    Some(classify_geometry(&geometry, properties))
}

/// Parses a GeoJSON `FeatureCollection` and classifies every feature.
///
/// # Errors
///
/// Fails if the text is not JSON or has no `features` array.
pub fn classify_collection(text: &str) -> Result<Vec<BoundaryShape>> {
    let root: JsonValue = serde_json::from_str(text)?;
    let JsonValue::Object(mut root) = root else {
        return Err(AnalyticsError::NotAFeatureCollection.into());
    };
    let Some(JsonValue::Array(features)) = root.remove("features") else {
        return Err(AnalyticsError::NotAFeatureCollection.into());
    };

    let mut shapes = Vec::new();
    let mut skipped = 0usize;

    for entry in features {
        match classify_entry(entry) {
            Some(found) => shapes.extend(found),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!(skipped, "Some boundary features could not be parsed");
    }
    debug!(shapes = shapes.len(), "Boundary shapes classified");

    Ok(shapes)
}
