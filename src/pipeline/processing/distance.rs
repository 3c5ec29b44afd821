use geo::algorithm::Distance;
use geo::{Closest, ClosestPoint, Coord, Haversine, Line, Point};

use crate::constants::MAX_DISTANCE_MM;
use crate::pipeline::processing::segments::StreetSegment;
use crate::types::Position;

/// A street segment paired with its distance to the house number being matched.
#[derive(Debug, Clone)]
pub struct Candidate<'a> {
    pub segment: &'a StreetSegment,
    /// Distance in whole millimetres.
    pub distance_mm: u64,
}

/// Geodesic distance in meters from `point` to the nearest point of `segment`.
///
/// The foot of the perpendicular is found in a local equirectangular frame
/// (longitudes scaled by the cosine of the point's latitude) and the distance
/// to it is measured on the sphere.
pub fn crosstrack_distance(point: Position, segment: &StreetSegment) -> f64 {
    let scale = point[1].to_radians().cos().max(f64::EPSILON);
    let to_local = |[lon, lat]: Position| Coord { x: lon * scale, y: lat };

    let origin = Point::new(point[0], point[1]);
    let line = Line::new(to_local(segment.start), to_local(segment.end));
    let foot = match line.closest_point(&Point::from(to_local(point))) {
        Closest::Intersection(_) => return 0.0,
        Closest::SinglePoint(foot) => foot,
        Closest::Indeterminate => Point::from(line.start),
    };

    Haversine.distance(origin, Point::new(foot.x() / scale, foot.y()))
}

/// Orders temporally valid candidates by distance, dropping those at or
/// beyond the ceiling.
#[derive(Debug, Clone, Copy)]
pub struct DistanceRanker {
    max_distance_mm: u64,
}

impl Default for DistanceRanker {
    fn default() -> Self {
        Self {
            max_distance_mm: MAX_DISTANCE_MM,
        }
    }
}

impl DistanceRanker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_distance_mm(&self) -> u64 {
        self.max_distance_mm
    }

    /// Distances must be strictly below the ceiling.
    pub fn within_ceiling(&self, distance_mm: u64) -> bool {
        distance_mm < self.max_distance_mm
    }

    /// Rank `segments` by distance to `point`. Equal distances keep input order.
    pub fn rank<'a, I>(&self, point: Position, segments: I) -> Vec<Candidate<'a>>
    where
        I: IntoIterator<Item = &'a StreetSegment>,
    {
        let mut ranked: Vec<Candidate<'a>> = segments
            .into_iter()
            .map(|segment| Candidate {
                segment,
                distance_mm: (crosstrack_distance(point, segment) * 1000.0).round() as u64,
            })
            .filter(|candidate| self.within_ceiling(candidate.distance_mm))
            .collect();

        ranked.sort_by_key(|candidate| candidate.distance_mm);
        ranked
    }

    /// The closest admissible candidate, if any.
    pub fn closest<'a, I>(&self, point: Position, segments: I) -> Option<Candidate<'a>>
    where
        I: IntoIterator<Item = &'a StreetSegment>,
    {
        self.rank(point, segments).into_iter().next()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pipeline::processing::segments::StreetProperties;
    use crate::types::ValidityInterval;
    use serde_json::Map;
    use std::sync::Arc;

    const EARTH_RADIUS_M: f64 = 6_371_008.8;

    /// Longitude offset, in degrees, that is `meters` east of a point at `lat`.
    pub(crate) fn meters_east(lat: f64, meters: f64) -> f64 {
        (meters / (EARTH_RADIUS_M * lat.to_radians().cos())).to_degrees()
    }

    fn segment(id: &str, start: Position, end: Position) -> StreetSegment {
        StreetSegment {
            properties: Arc::new(StreetProperties {
                street_id: id.to_string(),
                name: id.to_string(),
                validity: ValidityInterval::new("1900", "1960"),
                extra: Map::new(),
            }),
            start,
            end,
        }
    }

    #[test]
    fn test_perpendicular_distance_to_meridian_segment() {
        let street = segment("s", [-74.0, 40.70], [-74.0, 40.71]);
        let point = [-74.0 + meters_east(40.705, 5.0), 40.705];

        let distance = crosstrack_distance(point, &street);
        assert!((distance - 5.0).abs() < 0.01, "distance was {}", distance);
    }

    #[test]
    fn test_distance_is_clipped_to_segment_end() {
        let street = segment("s", [-74.0, 40.70], [-74.0, 40.71]);
        // 0.0001 degrees of latitude past the northern end, on the line's extension
        let point = [-74.0, 40.7101];

        let distance = crosstrack_distance(point, &street);
        assert!(distance > 10.0 && distance < 12.0, "distance was {}", distance);
    }

    #[test]
    fn test_point_on_segment_is_zero() {
        let street = segment("s", [0.0, 0.0], [0.0, 1.0]);
        assert_eq!(crosstrack_distance([0.0, 0.5], &street), 0.0);
    }

    #[test]
    fn test_rank_orders_and_discards_far_candidates() {
        let lat = 40.705;
        let near = segment("near", [-74.0, 40.70], [-74.0, 40.71]);
        let nearer = segment("nearer", [-74.0 + meters_east(lat, 8.0), 40.70], [-74.0 + meters_east(lat, 8.0), 40.71]);
        let far = segment("far", [-74.0 + meters_east(lat, 40.0), 40.70], [-74.0 + meters_east(lat, 40.0), 40.71]);
        let point = [-74.0 + meters_east(lat, 5.0), lat];

        let ranked = DistanceRanker::new().rank(point, [&near, &far, &nearer]);
        let ids: Vec<&str> = ranked.iter().map(|c| c.segment.street_id()).collect();
        assert_eq!(ids, vec!["nearer", "near"]);
        assert!(ranked.iter().all(|c| c.distance_mm < MAX_DISTANCE_MM));
        assert!(ranked[0].distance_mm <= ranked[1].distance_mm);
    }

    #[test]
    fn test_equal_distances_keep_input_order() {
        let first = segment("first", [0.0, 0.0], [0.0, 1.0]);
        let second = segment("second", [0.0, 0.0], [0.0, 1.0]);

        let ranked = DistanceRanker::new().rank([0.0, 0.5], [&first, &second]);
        assert_eq!(ranked[0].segment.street_id(), "first");
        assert_eq!(ranked[1].segment.street_id(), "second");
    }

    #[test]
    fn test_nothing_within_ceiling() {
        let street = segment("s", [-74.0, 40.70], [-74.0, 40.71]);
        let point = [-74.0 + meters_east(40.705, 25.5), 40.705];
        assert!(DistanceRanker::new().closest(point, [&street]).is_none());
    }

    #[test]
    fn test_ceiling_is_exclusive() {
        let ranker = DistanceRanker::new();
        assert!(ranker.within_ceiling(24_999));
        assert!(!ranker.within_ceiling(25_000));
    }

    #[test]
    fn test_rank_at_the_ceiling() {
        let lat = 40.705;
        let street = segment("s", [-74.0, 40.70], [-74.0, 40.71]);

        let just_inside = [-74.0 + meters_east(lat, 24.999), lat];
        let kept = DistanceRanker::new().closest(just_inside, [&street]).unwrap();
        assert_eq!(kept.distance_mm, 24_999);

        let on_ceiling = [-74.0 + meters_east(lat, 25.0), lat];
        assert!(DistanceRanker::new().closest(on_ceiling, [&street]).is_none());
    }
}
