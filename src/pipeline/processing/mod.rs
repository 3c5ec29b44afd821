// Pipeline processing: segmentation, spatial lookup, temporal and distance filtering

pub mod distance;
pub mod fuzzy_dates;
pub mod matcher;
pub mod segments;
pub mod spatial_index;
pub mod temporal;
pub mod transform;
