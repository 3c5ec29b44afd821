use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{InferenceError, Result};
use crate::observability::metrics;
use crate::types::{Position, StreetRecord, ValidityInterval};

/// Non-geometry properties of a street, shared by every segment cut from it.
#[derive(Debug, Clone, PartialEq)]
pub struct StreetProperties {
    pub street_id: String,
    pub name: String,
    pub validity: ValidityInterval,
    pub extra: Map<String, Value>,
}

/// A straight piece of street between two consecutive vertices.
#[derive(Debug, Clone)]
pub struct StreetSegment {
    pub properties: Arc<StreetProperties>,
    pub start: Position,
    pub end: Position,
}

impl StreetSegment {
    pub fn street_id(&self) -> &str {
        &self.properties.street_id
    }

    pub fn name(&self) -> &str {
        &self.properties.name
    }

    pub fn validity(&self) -> &ValidityInterval {
        &self.properties.validity
    }
}

/// Cuts street polylines into atomic segments.
#[derive(Debug, Default)]
pub struct SegmentBuilder {
    segments: Vec<StreetSegment>,
    streets_seen: usize,
    streets_without_geometry: usize,
}

impl SegmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build segments for a whole street collection in one call.
    pub fn build<I>(streets: I) -> Result<Vec<StreetSegment>>
    where
        I: IntoIterator<Item = StreetRecord>,
    {
        let mut builder = Self::new();
        for street in streets {
            builder.push(street);
        }
        builder.finish()
    }

    /// Segment one street. Streets without geometry are skipped.
    pub fn push(&mut self, street: StreetRecord) {
        self.streets_seen += 1;
        let Some(geometry) = street.geometry else {
            self.streets_without_geometry += 1;
            return;
        };

        let properties = Arc::new(StreetProperties {
            street_id: street.id,
            name: street.name,
            validity: street.validity,
            extra: street.properties,
        });

        let before = self.segments.len();
        for part in geometry.line_parts() {
            for pair in part.windows(2) {
                self.segments.push(StreetSegment {
                    properties: Arc::clone(&properties),
                    start: pair[0],
                    end: pair[1],
                });
            }
        }
        debug!(
            street_id = %properties.street_id,
            segments = self.segments.len() - before,
            "segmented street"
        );
    }

    /// Finish the build. An empty segment collection is fatal for the run.
    pub fn finish(self) -> Result<Vec<StreetSegment>> {
        metrics::segments::streets_read(self.streets_seen);
        metrics::segments::segments_built(self.segments.len());

        if self.segments.is_empty() {
            return Err(InferenceError::NoSegments);
        }
        info!(
            "Built {} street segments from {} streets ({} without geometry)",
            self.segments.len(),
            self.streets_seen,
            self.streets_without_geometry
        );
        Ok(self.segments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Geometry;

    fn street(id: &str, geometry: Option<Geometry>) -> StreetRecord {
        let mut extra = Map::new();
        extra.insert("borough".to_string(), Value::String("Manhattan".to_string()));
        StreetRecord {
            id: id.to_string(),
            name: format!("Street {}", id),
            validity: ValidityInterval::new("1900", "1960"),
            geometry,
            properties: extra,
        }
    }

    #[test]
    fn test_polyline_yields_one_segment_per_vertex_pair() {
        let geometry = Geometry::LineString {
            coordinates: vec![[0.0, 0.0], [0.0, 0.001], [0.001, 0.001], [0.001, 0.002]],
        };
        let segments = SegmentBuilder::build(vec![street("1", Some(geometry))]).unwrap();

        assert_eq!(segments.len(), 3);
        assert_eq!(segments[0].start, [0.0, 0.0]);
        assert_eq!(segments[0].end, [0.0, 0.001]);
        assert_eq!(segments[2].end, [0.001, 0.002]);
        for segment in &segments {
            assert_eq!(segment.street_id(), "1");
            assert_eq!(segment.name(), "Street 1");
            assert_eq!(segment.validity(), &ValidityInterval::new("1900", "1960"));
            assert_eq!(
                segment.properties.extra.get("borough"),
                Some(&Value::String("Manhattan".to_string()))
            );
        }
    }

    #[test]
    fn test_multilinestring_parts_are_not_joined() {
        let geometry = Geometry::MultiLineString {
            coordinates: vec![
                vec![[0.0, 0.0], [0.0, 0.001]],
                vec![[1.0, 1.0], [1.0, 1.001], [1.0, 1.002]],
            ],
        };
        let segments = SegmentBuilder::build(vec![street("2", Some(geometry))]).unwrap();
        assert_eq!(segments.len(), 3);
        assert!(segments.iter().all(|s| s.start != [0.0, 0.001] || s.end != [1.0, 1.0]));
    }

    #[test]
    fn test_streets_without_geometry_are_skipped() {
        let geometry = Geometry::LineString {
            coordinates: vec![[0.0, 0.0], [0.0, 0.001]],
        };
        let segments =
            SegmentBuilder::build(vec![street("1", None), street("2", Some(geometry))]).unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].street_id(), "2");
    }

    #[test]
    fn test_no_segments_is_fatal() {
        let result = SegmentBuilder::build(vec![street("1", None)]);
        assert!(matches!(result, Err(InferenceError::NoSegments)));

        let single_vertex = Geometry::LineString {
            coordinates: vec![[0.0, 0.0]],
        };
        let result = SegmentBuilder::build(vec![street("2", Some(single_vertex))]);
        assert!(matches!(result, Err(InferenceError::NoSegments)));
    }
}
