use chrono::{DateTime, Duration, Utc};

use crate::constants::MS_THRESHOLD;
use crate::error::{InferenceError, Result};
use crate::pipeline::processing::fuzzy_dates::{self, DateResolver};
use crate::types::ValidityInterval;

/// A validity interval resolved to concrete instants: the earliest possible
/// start and the latest possible end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedInterval {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}

/// Hard filter deciding whether a street could have existed for the whole
/// lifetime of an address, allowing `tolerance` of slack on both ends of
/// the street's validity.
#[derive(Debug, Clone, Copy)]
pub struct TemporalFilter {
    tolerance: Duration,
    resolver: DateResolver,
}

impl Default for TemporalFilter {
    fn default() -> Self {
        Self {
            tolerance: Duration::milliseconds(MS_THRESHOLD),
            resolver: fuzzy_dates::resolve,
        }
    }
}

impl TemporalFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap the fuzzy date policy.
    pub fn with_resolver(resolver: DateResolver) -> Self {
        Self {
            resolver,
            ..Self::default()
        }
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// Resolve `validSince` to its earliest and `validUntil` to its latest instant.
    pub fn resolve(&self, validity: &ValidityInterval) -> Result<ResolvedInterval> {
        let since = validity
            .since
            .as_deref()
            .ok_or_else(|| InferenceError::MissingField("validSince".to_string()))?;
        let until = validity
            .until
            .as_deref()
            .ok_or_else(|| InferenceError::MissingField("validUntil".to_string()))?;

        Ok(ResolvedInterval {
            since: (self.resolver)(since)?.earliest,
            until: (self.resolver)(until)?.latest,
        })
    }

    /// `segSince - T <= addrSince && segUntil + T >= addrUntil`
    pub fn admits(&self, address: &ResolvedInterval, segment: &ResolvedInterval) -> bool {
        segment.since - self.tolerance <= address.since
            && segment.until + self.tolerance >= address.until
    }

    /// Resolve the segment's validity and test it against an already resolved address.
    pub fn admits_validity(&self, address: &ResolvedInterval, segment: &ValidityInterval) -> Result<bool> {
        Ok(self.admits(address, &self.resolve(segment)?))
    }
}
