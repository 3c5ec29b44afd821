use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{InferenceError, Result};

/// A longitude/latitude pair in the order GeoJSON uses.
pub type Position = [f64; 2];

/// GeoJSON geometries the pipeline understands. Coordinates are geographic (WGS84).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: Position },
    LineString { coordinates: Vec<Position> },
    MultiLineString { coordinates: Vec<Vec<Position>> },
}

impl Geometry {
    /// The position of a point geometry, or an error for any other kind.
    pub fn as_point(&self) -> Result<Position> {
        match self {
            Geometry::Point { coordinates } => Ok(*coordinates),
            other => Err(InferenceError::InvalidGeometry(format!(
                "expected a Point, found {}",
                other.kind()
            ))),
        }
    }

    /// Vertex sequences of every line part; empty for points.
    pub fn line_parts(&self) -> Vec<&[Position]> {
        match self {
            Geometry::Point { .. } => Vec::new(),
            Geometry::LineString { coordinates } => vec![coordinates.as_slice()],
            Geometry::MultiLineString { coordinates } => {
                coordinates.iter().map(|part| part.as_slice()).collect()
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Point { .. } => "Point",
            Geometry::LineString { .. } => "LineString",
            Geometry::MultiLineString { .. } => "MultiLineString",
        }
    }
}

/// The fuzzy `validSince`/`validUntil` pair carried by streets and house numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidityInterval {
    #[serde(rename = "validSince", default, skip_serializing_if = "Option::is_none")]
    pub since: Option<String>,
    #[serde(rename = "validUntil", default, skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
}

impl ValidityInterval {
    pub fn new(since: &str, until: &str) -> Self {
        Self {
            since: Some(since.to_string()),
            until: Some(until.to_string()),
        }
    }
}

/// A street object as produced by the streets dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreetRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub validity: ValidityInterval,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    /// Remaining properties, carried onto every derived segment.
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

/// A house number object as produced by the house numbers dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HouseNumberRecord {
    pub id: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub record_type: Option<String>,
    #[serde(flatten)]
    pub validity: ValidityInterval,
    /// Opaque payload; `number` holds the house number label.
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

impl HouseNumberRecord {
    /// The house number label, rendered without JSON quoting.
    pub fn number_label(&self) -> Option<String> {
        match self.data.get("number")? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_street_keeps_extra_properties() {
        let street: StreetRecord = serde_json::from_value(json!({
            "id": "12",
            "name": "Broadway",
            "type": "st:Street",
            "validSince": "1900",
            "validUntil": "1960",
            "geometry": {"type": "LineString", "coordinates": [[-74.0, 40.7], [-74.0, 40.71]]}
        }))
        .unwrap();

        assert_eq!(street.validity, ValidityInterval::new("1900", "1960"));
        assert_eq!(street.properties.get("type"), Some(&json!("st:Street")));
        assert!(!street.properties.contains_key("geometry"));
        assert_eq!(street.geometry.unwrap().line_parts().len(), 1);
    }

    #[test]
    fn test_house_number_without_geometry() {
        let house: HouseNumberRecord = serde_json::from_value(json!({
            "id": "building-inspector/1",
            "type": "st:Address",
            "validSince": "1920",
            "validUntil": "1925",
            "data": {"number": 10}
        }))
        .unwrap();

        assert!(house.geometry.is_none());
        assert_eq!(house.number_label(), Some("10".to_string()));
    }

    #[test]
    fn test_point_accessor_rejects_lines() {
        let line = Geometry::LineString {
            coordinates: vec![[0.0, 0.0], [1.0, 1.0]],
        };
        assert!(line.as_point().is_err());
        let point = Geometry::Point { coordinates: [1.0, 2.0] };
        assert_eq!(point.as_point().unwrap(), [1.0, 2.0]);
    }
}
