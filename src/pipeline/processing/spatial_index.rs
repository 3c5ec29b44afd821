use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{RTree, AABB};
use std::collections::HashSet;
use tracing::info;

use crate::error::{InferenceError, Result};
use crate::pipeline::processing::segments::StreetSegment;
use crate::types::{Geometry, Position};

/// Capability interface over a spatial index of street segments.
///
/// Any structure able to answer bounding-region and k-nearest queries can
/// back the matcher. The index is built once and only read afterwards.
pub trait SpatialIndex: Send + Sync {
    /// Replace the indexed collection with `segments`.
    fn index(&mut self, segments: Vec<StreetSegment>) -> Result<()>;

    /// Segments whose bounding box intersects the bounding box of `geometry`.
    fn search(&self, geometry: &Geometry) -> Result<Vec<&StreetSegment>>;

    /// The `k` segments closest to `geometry` by the index's own metric.
    fn nearest(&self, geometry: &Geometry, k: usize) -> Result<Vec<&StreetSegment>>;

    /// Union of `search` and `nearest`, in that order, without repeats.
    fn candidates(&self, geometry: &Geometry, k: usize) -> Result<Vec<&StreetSegment>>;
}

type SegmentEntry = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// R-tree over segment bounding boxes, bulk loaded once per run.
#[derive(Default)]
pub struct RTreeSegmentIndex {
    tree: Option<RTree<SegmentEntry>>,
    segments: Vec<StreetSegment>,
}

impl RTreeSegmentIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index over `segments` in one step.
    pub fn from_segments(segments: Vec<StreetSegment>) -> Result<Self> {
        let mut index = Self::new();
        index.index(segments)?;
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn tree(&self) -> Result<&RTree<SegmentEntry>> {
        self.tree.as_ref().ok_or(InferenceError::IndexNotBuilt)
    }

    fn resolve(&self, positions: impl IntoIterator<Item = usize>) -> Vec<&StreetSegment> {
        positions.into_iter().map(|position| &self.segments[position]).collect()
    }

    fn search_positions(&self, geometry: &Geometry) -> Result<Vec<usize>> {
        let tree = self.tree()?;
        let (min, max) = bounding_box(geometry)?;
        let envelope = AABB::from_corners(min, max);
        Ok(tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|entry| entry.data)
            .collect())
    }

    fn nearest_positions(&self, geometry: &Geometry, k: usize) -> Result<Vec<usize>> {
        let tree = self.tree()?;
        let (min, max) = bounding_box(geometry)?;
        let centre = [(min[0] + max[0]) / 2.0, (min[1] + max[1]) / 2.0];
        Ok(tree
            .nearest_neighbor_iter(&centre)
            .take(k)
            .map(|entry| entry.data)
            .collect())
    }
}

impl SpatialIndex for RTreeSegmentIndex {
    fn index(&mut self, segments: Vec<StreetSegment>) -> Result<()> {
        if segments.is_empty() {
            return Err(InferenceError::NoSegments);
        }
        let entries: Vec<SegmentEntry> = segments
            .iter()
            .enumerate()
            .map(|(position, segment)| {
                GeomWithData::new(Rectangle::from_corners(segment.start, segment.end), position)
            })
            .collect();

        self.tree = Some(RTree::bulk_load(entries));
        self.segments = segments;
        info!("Street segment R-tree built with {} items", self.segments.len());
        Ok(())
    }

    fn search(&self, geometry: &Geometry) -> Result<Vec<&StreetSegment>> {
        Ok(self.resolve(self.search_positions(geometry)?))
    }

    fn nearest(&self, geometry: &Geometry, k: usize) -> Result<Vec<&StreetSegment>> {
        Ok(self.resolve(self.nearest_positions(geometry, k)?))
    }

    fn candidates(&self, geometry: &Geometry, k: usize) -> Result<Vec<&StreetSegment>> {
        let mut seen = HashSet::new();
        let mut positions = self.search_positions(geometry)?;
        positions.extend(self.nearest_positions(geometry, k)?);
        positions.retain(|position| seen.insert(*position));
        Ok(self.resolve(positions))
    }
}

/// Lower-left and upper-right corners of a geometry.
fn bounding_box(geometry: &Geometry) -> Result<(Position, Position)> {
    let positions: Vec<Position> = match geometry {
        Geometry::Point { coordinates } => vec![*coordinates],
        other => other.line_parts().into_iter().flatten().copied().collect(),
    };
    let first = positions
        .first()
        .ok_or_else(|| InferenceError::InvalidGeometry("geometry has no coordinates".to_string()))?;

    let mut min = *first;
    let mut max = *first;
    for [x, y] in positions.iter().skip(1) {
        min = [min[0].min(*x), min[1].min(*y)];
        max = [max[0].max(*x), max[1].max(*y)];
    }
    Ok((min, max))
}
