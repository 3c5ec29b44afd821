//! Metrics for the address inference pipeline
//!
//! Names follow the Prometheus conventions. Recording is a no-op until a
//! recorder is installed with [`init`].

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fmt;
use std::sync::OnceLock;
use tracing::info;

/// Enum representing all metric names used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Segment metrics
    SegmentsStreetsRead,
    SegmentsBuilt,

    // Matcher metrics
    MatcherHouseNumbersProcessed,
    MatcherHouseNumbersMatched,
    MatcherHouseNumbersUnmatched,
    MatcherHouseNumbersSkipped,
    MatcherDistanceMillimetres,
    MatcherDuration,

    // Transform metrics
    TransformRecordsRead,
    TransformRecordsDropped,
    TransformGraphRecordsWritten,
    TransformDuration,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            // Segment metrics
            MetricName::SegmentsStreetsRead => "addresses_segments_streets_read_total",
            MetricName::SegmentsBuilt => "addresses_segments_built_total",

            // Matcher metrics
            MetricName::MatcherHouseNumbersProcessed => "addresses_matcher_house_numbers_processed_total",
            MetricName::MatcherHouseNumbersMatched => "addresses_matcher_house_numbers_matched_total",
            MetricName::MatcherHouseNumbersUnmatched => "addresses_matcher_house_numbers_unmatched_total",
            MetricName::MatcherHouseNumbersSkipped => "addresses_matcher_house_numbers_skipped_total",
            MetricName::MatcherDistanceMillimetres => "addresses_matcher_distance_millimetres",
            MetricName::MatcherDuration => "addresses_matcher_duration_seconds",

            // Transform metrics
            MetricName::TransformRecordsRead => "addresses_transform_records_read_total",
            MetricName::TransformRecordsDropped => "addresses_transform_records_dropped_total",
            MetricName::TransformGraphRecordsWritten => "addresses_transform_graph_records_written_total",
            MetricName::TransformDuration => "addresses_transform_duration_seconds",
        }
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Current metrics in the Prometheus text format, if a recorder is installed.
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Segment Metrics
// ============================================================================

pub mod segments {
    use super::MetricName;

    pub fn streets_read(count: usize) {
        ::metrics::counter!(MetricName::SegmentsStreetsRead.as_str()).increment(count as u64);
    }

    pub fn segments_built(count: usize) {
        ::metrics::counter!(MetricName::SegmentsBuilt.as_str()).increment(count as u64);
    }
}

// ============================================================================
// Matcher Metrics
// ============================================================================

pub mod matcher {
    use super::MetricName;

    /// Record one house number that produced a match result
    pub fn house_number_processed(matched: bool) {
        ::metrics::counter!(MetricName::MatcherHouseNumbersProcessed.as_str()).increment(1);
        let outcome = if matched {
            MetricName::MatcherHouseNumbersMatched
        } else {
            MetricName::MatcherHouseNumbersUnmatched
        };
        ::metrics::counter!(outcome.as_str()).increment(1);
    }

    pub fn house_numbers_skipped(count: u64) {
        ::metrics::counter!(MetricName::MatcherHouseNumbersSkipped.as_str()).increment(count);
    }

    pub fn distance_mm(distance: u64) {
        ::metrics::histogram!(MetricName::MatcherDistanceMillimetres.as_str()).record(distance as f64);
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::MatcherDuration.as_str()).record(secs);
    }
}

// ============================================================================
// Transform Metrics
// ============================================================================

pub mod transform {
    use super::MetricName;

    pub fn record_read() {
        ::metrics::counter!(MetricName::TransformRecordsRead.as_str()).increment(1);
    }

    pub fn record_dropped() {
        ::metrics::counter!(MetricName::TransformRecordsDropped.as_str()).increment(1);
    }

    pub fn graph_record_written(kind: &'static str) {
        ::metrics::counter!(MetricName::TransformGraphRecordsWritten.as_str(), "kind" => kind).increment(1);
    }

    pub fn duration(secs: f64) {
        ::metrics::histogram!(MetricName::TransformDuration.as_str()).record(secs);
    }
}
