use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::DatasetsConfig;
use crate::constants::{self, get_full_id, get_internal_id, NEAREST_NEIGHBOURS, PROGRESS_INTERVAL};
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::processing::distance::DistanceRanker;
use crate::pipeline::processing::spatial_index::SpatialIndex;
use crate::pipeline::processing::temporal::TemporalFilter;
use crate::types::{Geometry, HouseNumberRecord, ValidityInterval};

/// A house number matched to the closest valid street.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchedAddress {
    /// Local id of the house number, reused as the address id.
    pub id: String,
    /// `"<number> <street name>"`
    pub name: String,
    pub house_number_id: String,
    pub street_id: String,
    #[serde(flatten)]
    pub validity: ValidityInterval,
    pub street_name: String,
    pub address_data: Map<String, Value>,
    /// Distance to the street in whole millimetres.
    pub distance: u64,
    pub address_geometry: Geometry,
}

/// A house number for which no street qualified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedAddress {
    pub error: String,
    pub house_number_id: String,
    pub address_data: Map<String, Value>,
    pub address_geometry: Geometry,
}

/// Outcome of matching one house number. Every house number with a
/// geometry produces exactly one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchResult {
    Matched(MatchedAddress),
    Unmatched(UnmatchedAddress),
}

impl MatchResult {
    pub fn house_number_id(&self) -> &str {
        match self {
            MatchResult::Matched(m) => &m.house_number_id,
            MatchResult::Unmatched(u) => &u.house_number_id,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, MatchResult::Matched(_))
    }
}

/// Matches house numbers to street segments held by a spatial index.
pub struct AddressMatcher<I> {
    index: I,
    temporal: TemporalFilter,
    ranker: DistanceRanker,
    datasets: DatasetsConfig,
    house_number_type: Option<String>,
    nearest: usize,
    progress_interval: u64,
}

impl<I: SpatialIndex> AddressMatcher<I> {
    pub fn new(index: I) -> Self {
        Self {
            index,
            temporal: TemporalFilter::new(),
            ranker: DistanceRanker::new(),
            datasets: DatasetsConfig::default(),
            house_number_type: Some(constants::ADDRESS_TYPE.to_string()),
            nearest: NEAREST_NEIGHBOURS,
            progress_interval: PROGRESS_INTERVAL,
        }
    }

    pub fn with_datasets(mut self, datasets: DatasetsConfig) -> Self {
        self.datasets = datasets;
        self
    }

    /// Only records of this `type` are matched; `None` accepts every record.
    /// Records lacking a `type` field are always accepted.
    pub fn with_house_number_type(mut self, record_type: Option<String>) -> Self {
        self.house_number_type = record_type;
        self
    }

    pub fn with_temporal_filter(mut self, temporal: TemporalFilter) -> Self {
        self.temporal = temporal;
        self
    }

    pub fn with_progress_interval(mut self, interval: u64) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    /// A fresh progress counter using this matcher's reporting interval.
    pub fn progress(&self) -> Progress {
        Progress::new(self.progress_interval)
    }

    /// Whether a record takes part in matching at all.
    pub fn accepts(&self, house: &HouseNumberRecord) -> bool {
        let type_ok = match (&self.house_number_type, &house.record_type) {
            (Some(expected), Some(actual)) => expected == actual,
            _ => true,
        };
        type_ok && house.geometry.is_some()
    }

    /// Match a single house number. Returns `None` for records that are
    /// skipped (no geometry, or not a house number).
    pub fn match_house_number(&self, house: &HouseNumberRecord) -> Result<Option<MatchResult>> {
        if !self.accepts(house) {
            return Ok(None);
        }
        let Some(geometry) = house.geometry.as_ref() else {
            return Ok(None);
        };
        let point = geometry.as_point()?;

        let candidates = self.index.candidates(geometry, self.nearest)?;
        let mut admitted = Vec::with_capacity(candidates.len());
        if !candidates.is_empty() {
            let address = self.temporal.resolve(&house.validity)?;
            for segment in candidates {
                if self.temporal.admits_validity(&address, segment.validity())? {
                    admitted.push(segment);
                }
            }
        }

        let house_number_id = get_full_id(&self.datasets.house_numbers, &house.id);
        let result = match self.ranker.closest(point, admitted) {
            Some(closest) => {
                let street_name = closest.segment.name().to_string();
                let name = match house.number_label() {
                    Some(number) => format!("{} {}", number, street_name),
                    None => street_name.clone(),
                };
                metrics::matcher::distance_mm(closest.distance_mm);
                MatchResult::Matched(MatchedAddress {
                    id: get_internal_id(&house.id),
                    name,
                    house_number_id,
                    street_id: get_full_id(&self.datasets.streets, closest.segment.street_id()),
                    validity: house.validity.clone(),
                    street_name,
                    address_data: house.data.clone(),
                    distance: closest.distance_mm,
                    address_geometry: geometry.clone(),
                })
            }
            None => MatchResult::Unmatched(UnmatchedAddress {
                error: constants::unmatched_reason(),
                house_number_id,
                address_data: house.data.clone(),
                address_geometry: geometry.clone(),
            }),
        };

        debug!(
            house_number_id = %result.house_number_id(),
            matched = result.is_matched(),
            "matched house number"
        );
        metrics::matcher::house_number_processed(result.is_matched());
        Ok(Some(result))
    }
}

/// Counts processed house numbers and logs every `interval` of them.
#[derive(Debug, Clone)]
pub struct Progress {
    processed: u64,
    interval: u64,
}

impl Progress {
    pub fn new(interval: u64) -> Self {
        Self {
            processed: 0,
            interval: interval.max(1),
        }
    }

    pub fn tick(&mut self) {
        self.processed += 1;
        if self.processed % self.interval == 0 {
            info!("Processed {} house numbers", self.processed);
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }
}
