//! Matching thresholds and dataset identifiers shared across the pipeline.
//! The thresholds are fixed for every run and are not read from configuration.

/// Slack, in years, applied to both ends of a street segment's validity.
pub const YEAR_THRESHOLD: i64 = 15;

/// Street segments this far away (in meters) or further are never matched.
pub const MAX_DISTANCE_METERS: u64 = 25;

/// Distance ceiling in the integer millimetre encoding used for ranking.
pub const MAX_DISTANCE_MM: u64 = MAX_DISTANCE_METERS * 1000;

/// Fan-out of the k-nearest-neighbour widening query.
pub const NEAREST_NEIGHBOURS: usize = 10;

/// A progress line is logged every this many processed house numbers.
pub const PROGRESS_INTERVAL: u64 = 10_000;

/// `YEAR_THRESHOLD` in milliseconds, using 365-day years.
pub const MS_THRESHOLD: i64 = YEAR_THRESHOLD * 365 * 24 * 60 * 60 * 1000;

// Dataset names used to namespace entity ids
pub const STREETS_DATASET: &str = "nyc-streets";
pub const HOUSE_NUMBERS_DATASET: &str = "building-inspector";
pub const OUTPUT_DATASET: &str = "addresses";

// Entity and relation types emitted by the transform stage
pub const ADDRESS_TYPE: &str = "st:Address";
pub const RELATION_IN: &str = "st:in";
pub const RELATION_SAME_AS: &str = "st:sameAs";

/// File name of the intermediate output written by the matching stage.
pub const INFERRED_FILE: &str = "inferred.ndjson";

/// Diagnostic reason attached to every unmatched house number.
pub fn unmatched_reason() -> String {
    format!(
        "Can't find street within {} meters and {} years",
        MAX_DISTANCE_METERS, YEAR_THRESHOLD
    )
}

/// Namespace a local id with its dataset. Already namespaced ids are returned unchanged.
pub fn get_full_id(dataset: &str, id: &str) -> String {
    if id.contains('/') {
        return id.to_string();
    }
    format!("{}/{}", dataset, id)
}

/// Strip the dataset namespace from an id, if present.
pub fn get_internal_id(id: &str) -> String {
    match id.split('/').nth(1) {
        Some(local) => local.to_string(),
        None => id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_id_adds_namespace() {
        assert_eq!(get_full_id("nyc-streets", "42"), "nyc-streets/42");
    }

    #[test]
    fn test_full_id_is_idempotent() {
        assert_eq!(get_full_id("nyc-streets", "nyc-streets/42"), "nyc-streets/42");
        let once = get_full_id(HOUSE_NUMBERS_DATASET, "7");
        assert_eq!(get_full_id(HOUSE_NUMBERS_DATASET, &once), once);
    }

    #[test]
    fn test_internal_id() {
        assert_eq!(get_internal_id("nyc-streets/42"), "42");
        assert_eq!(get_internal_id("42"), "42");
    }

    #[test]
    fn test_threshold_in_milliseconds() {
        assert_eq!(MS_THRESHOLD, 473_040_000_000);
        assert_eq!(MAX_DISTANCE_MM, 25_000);
    }

    #[test]
    fn test_unmatched_reason_cites_thresholds() {
        let reason = unmatched_reason();
        assert!(reason.contains("25 meters"));
        assert!(reason.contains("15 years"));
    }
}
