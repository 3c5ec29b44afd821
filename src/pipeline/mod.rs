// Address inference pipeline: street segmentation, matching, and graph record shaping

pub mod processing;

// Re-export key types from the processing stage
pub use processing::matcher::{AddressMatcher, MatchResult};
pub use processing::transform::{GraphRecord, RecordTransformer};
