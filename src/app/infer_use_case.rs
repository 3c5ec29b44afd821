use anyhow::{Context, Result};
use std::time::Instant;
use tracing::{info, warn};

use crate::app::ports::{MatchOutputPort, RecordSourcePort};
use crate::config::{DatasetsConfig, MatchingConfig};
use crate::observability::metrics;
use crate::pipeline::processing::matcher::AddressMatcher;
use crate::pipeline::processing::segments::SegmentBuilder;
use crate::pipeline::processing::spatial_index::{RTreeSegmentIndex, SpatialIndex};
use crate::types::{HouseNumberRecord, StreetRecord};

/// Use case for matching every house number to its closest valid street
pub struct InferUseCase {
    output: Box<dyn MatchOutputPort>,
    datasets: DatasetsConfig,
    matching: MatchingConfig,
}

impl InferUseCase {
    pub fn new(output: Box<dyn MatchOutputPort>) -> Self {
        Self {
            output,
            datasets: DatasetsConfig::default(),
            matching: MatchingConfig::default(),
        }
    }

    pub fn with_config(
        output: Box<dyn MatchOutputPort>,
        datasets: DatasetsConfig,
        matching: MatchingConfig,
    ) -> Self {
        Self {
            output,
            datasets,
            matching,
        }
    }

    /// Segment every street and index the segments. Fails if no street has a geometry.
    pub async fn build_index(
        &self,
        streets: &mut dyn RecordSourcePort<StreetRecord>,
    ) -> Result<RTreeSegmentIndex> {
        let mut builder = SegmentBuilder::new();
        while let Some(street) = streets.next_record().await? {
            builder.push(street);
        }
        let segments = builder.finish()?;

        info!("Indexing street segments");
        let index = RTreeSegmentIndex::from_segments(segments)?;
        Ok(index)
    }

    /// Run the matching stage: build the index, then match house numbers one
    /// at a time, writing each result before reading the next record. Stops
    /// at the first error.
    pub async fn run(
        &self,
        streets: &mut dyn RecordSourcePort<StreetRecord>,
        house_numbers: &mut dyn RecordSourcePort<HouseNumberRecord>,
    ) -> Result<InferStats> {
        let start_time = Instant::now();
        let index = self.build_index(streets).await?;
        let segments = index.len();
        let matcher = self.matcher(index);

        info!("Finding closest line segments for each house number");
        let mut stats = InferStats {
            segments,
            ..InferStats::default()
        };
        // Results written before a failure are kept.
        let outcome = self.match_all(&matcher, house_numbers, &mut stats).await;
        self.output.flush().await?;
        outcome?;

        metrics::matcher::house_numbers_skipped(stats.skipped);
        metrics::matcher::duration(start_time.elapsed().as_secs_f64());

        info!(
            "Matching completed in {:.2}s: {} matched, {} unmatched, {} skipped",
            start_time.elapsed().as_secs_f64(),
            stats.matched,
            stats.unmatched,
            stats.skipped
        );
        if stats.processed() > 0 && stats.matched == 0 {
            warn!("No house number could be matched to a street");
        }
        Ok(stats)
    }

    async fn match_all<I: SpatialIndex>(
        &self,
        matcher: &AddressMatcher<I>,
        house_numbers: &mut dyn RecordSourcePort<HouseNumberRecord>,
        stats: &mut InferStats,
    ) -> Result<()> {
        let mut progress = matcher.progress();
        while let Some(house) = house_numbers.next_record().await? {
            stats.house_numbers_read += 1;
            let Some(result) = matcher
                .match_house_number(&house)
                .with_context(|| format!("Failed to match house number {}", house.id))?
            else {
                stats.skipped += 1;
                continue;
            };

            progress.tick();
            if result.is_matched() {
                stats.matched += 1;
            } else {
                stats.unmatched += 1;
            }
            self.output.write_match(&result).await?;
        }
        Ok(())
    }

    fn matcher<I: SpatialIndex>(&self, index: I) -> AddressMatcher<I> {
        let house_number_type = self
            .matching
            .house_number_type
            .clone()
            .filter(|record_type| !record_type.is_empty());
        AddressMatcher::new(index)
            .with_datasets(self.datasets.clone())
            .with_house_number_type(house_number_type)
            .with_progress_interval(self.matching.progress_interval)
    }
}

/// Counters for one matching run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InferStats {
    pub segments: usize,
    pub house_numbers_read: u64,
    pub skipped: u64,
    pub matched: u64,
    pub unmatched: u64,
}

impl InferStats {
    /// House numbers that produced a result.
    pub fn processed(&self) -> u64 {
        self.matched + self.unmatched
    }

    /// Match rate as percentage
    pub fn match_rate(&self) -> f64 {
        if self.processed() == 0 {
            return 0.0;
        }
        self.matched as f64 / self.processed() as f64 * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::processing::matcher::MatchResult;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    struct MockSource<T> {
        records: VecDeque<T>,
    }

    impl<T> MockSource<T> {
        fn new(records: Vec<T>) -> Self {
            Self {
                records: records.into(),
            }
        }
    }

    #[async_trait]
    impl<T: Send> RecordSourcePort<T> for MockSource<T> {
        async fn next_record(&mut self) -> Result<Option<T>> {
            Ok(self.records.pop_front())
        }
    }

    struct MockMatchOutput {
        pub records: Arc<Mutex<Vec<MatchResult>>>,
    }

    impl MockMatchOutput {
        fn new() -> Self {
            Self {
                records: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl MatchOutputPort for MockMatchOutput {
        async fn write_match(&self, result: &MatchResult) -> Result<()> {
            self.records.lock().await.push(result.clone());
            Ok(())
        }
    }

    fn street(geometry: serde_json::Value) -> StreetRecord {
        serde_json::from_value(json!({
            "id": "nyc-streets/42",
            "name": "Broadway",
            "validSince": "1900",
            "validUntil": "1960",
            "geometry": geometry
        }))
        .unwrap()
    }

    fn house(id: &str, lon: f64, since: &str) -> HouseNumberRecord {
        serde_json::from_value(json!({
            "id": id,
            "type": "st:Address",
            "validSince": since,
            "validUntil": "1925",
            "data": {"number": "10"},
            "geometry": {"type": "Point", "coordinates": [lon, 40.705]}
        }))
        .unwrap()
    }

    fn line() -> serde_json::Value {
        json!({"type": "LineString", "coordinates": [[-74.0, 40.70], [-74.0, 40.71]]})
    }

    #[tokio::test]
    async fn test_infer_use_case_writes_one_result_per_house_number() {
        let output = Box::new(MockMatchOutput::new());
        let records_ref = output.records.clone();
        let use_case = InferUseCase::new(output);

        let mut streets = MockSource::new(vec![street(line())]);
        let mut no_geometry = house("3", -74.0, "1920");
        no_geometry.geometry = None;
        let mut house_numbers = MockSource::new(vec![
            house("1", -73.99995, "1920"),
            house("2", -73.999, "1920"),
            no_geometry,
        ]);

        let stats = use_case.run(&mut streets, &mut house_numbers).await.unwrap();
        assert_eq!(stats.house_numbers_read, 3);
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.unmatched, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.match_rate(), 50.0);

        let written = records_ref.lock().await;
        assert_eq!(written.len(), 2);
        assert!(written[0].is_matched());
        assert_eq!(written[1].house_number_id(), "building-inspector/2");
    }

    #[tokio::test]
    async fn test_no_street_geometry_is_fatal() {
        let use_case = InferUseCase::new(Box::new(MockMatchOutput::new()));
        let mut streets = MockSource::new(vec![street(serde_json::Value::Null)]);
        let mut house_numbers = MockSource::new(vec![house("1", -74.0, "1920")]);

        let error = use_case.run(&mut streets, &mut house_numbers).await.unwrap_err();
        assert!(error.to_string().contains("No streets with geometries"));
    }

    #[tokio::test]
    async fn test_first_bad_record_aborts_the_run() {
        let output = Box::new(MockMatchOutput::new());
        let records_ref = output.records.clone();
        let use_case = InferUseCase::new(output);

        let mut streets = MockSource::new(vec![street(line())]);
        let mut house_numbers = MockSource::new(vec![
            house("1", -73.99995, "1920"),
            house("2", -73.99995, "someday"),
            house("3", -73.99995, "1920"),
        ]);

        let error = use_case.run(&mut streets, &mut house_numbers).await.unwrap_err();
        assert!(format!("{:#}", error).contains("house number 2"));
        assert_eq!(records_ref.lock().await.len(), 1);
    }
}
