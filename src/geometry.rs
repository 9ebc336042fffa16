use geo_types::Coord;
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{Result, StatsError};

/// A GeoJSON position. Only longitude and latitude are kept; a trailing
/// altitude is accepted and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "[f64; 2]")]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
}

impl Position {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(values: Vec<f64>) -> std::result::Result<Self, Self::Error> {
        if values.len() < 2 {
            return Err(format!(
                "position needs at least 2 numbers, got {}",
                values.len()
            ));
        }
        if !values[0].is_finite() || !values[1].is_finite() {
            return Err("position components must be finite".to_string());
        }
        Ok(Position::new(values[0], values[1]))
    }
}

impl From<Position> for [f64; 2] {
    fn from(position: Position) -> Self {
        [position.lon, position.lat]
    }
}

impl From<Position> for Coord<f64> {
    fn from(position: Position) -> Self {
        Coord {
            x: position.lon,
            y: position.lat,
        }
    }
}

/// The geometry shapes the aggregator understands, keyed by the GeoJSON
/// `type` member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    Polygon(Vec<Vec<Position>>),
    MultiPolygon(Vec<Vec<Vec<Position>>>),
}

impl Geometry {
    pub fn type_name(&self) -> &'static str {
        match self {
            Geometry::Point(_) => "Point",
            Geometry::MultiPoint(_) => "MultiPoint",
            Geometry::LineString(_) => "LineString",
            Geometry::MultiLineString(_) => "MultiLineString",
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }
}

/// Flattens a geometry into its coordinates, keeping the original point order
/// and dropping every ring/line/polygon boundary.
pub fn flatten_coords(geometry: &Geometry) -> Result<Vec<Coord<f64>>> {
    let coords: Vec<Coord<f64>> = match geometry {
        Geometry::Point(position) => vec![(*position).into()],
        Geometry::MultiPoint(positions) | Geometry::LineString(positions) => {
            positions.iter().copied().map(Coord::from).collect()
        }
        Geometry::MultiLineString(lines) | Geometry::Polygon(lines) => lines
            .iter()
            .flatten()
            .copied()
            .map(Coord::from)
            .collect(),
        Geometry::MultiPolygon(polygons) => polygons
            .iter()
            .flatten()
            .flatten()
            .copied()
            .map(Coord::from)
            .collect(),
    };
    if coords.is_empty() {
        return Err(StatsError::InvalidGeometry(format!(
            "{} has no coordinates",
            geometry.type_name()
        )));
    }
    Ok(coords)
}

/// One input record: a typed geometry plus every other member of the GeoJSON
/// object, carried along untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry,
    pub members: Map<String, Value>,
}

impl Feature {
    pub fn new(geometry: Geometry) -> Self {
        let mut members = Map::new();
        members.insert("type".to_string(), Value::String("Feature".to_string()));
        members.insert("properties".to_string(), Value::Object(Map::new()));
        Self { geometry, members }
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(mut members) = value else {
            return Err(StatsError::InvalidGeometry(
                "feature must be a JSON object".to_string(),
            ));
        };
        let geometry = match members.remove("geometry") {
            Some(Value::Null) | None => {
                return Err(StatsError::InvalidGeometry(
                    "feature has no geometry".to_string(),
                ));
            }
            Some(geometry) => Geometry::deserialize(geometry)
                .map_err(|err| StatsError::InvalidGeometry(err.to_string()))?,
        };
        Ok(Self { geometry, members })
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| StatsError::InvalidGeometry(format!("malformed JSON: {err}")))?;
        Self::from_value(value)
    }
}

impl Serialize for Feature {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.members.len() + 1))?;
        for (key, value) in self.members.iter() {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry("geometry", &self.geometry)?;
        map.end()
    }
}
