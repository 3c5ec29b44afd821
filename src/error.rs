use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON deserialization failed at {source_name}:{line}: {error}")]
    JsonLine {
        source_name: String,
        line: usize,
        error: serde_json::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No streets with geometries found, nothing to index")]
    NoSegments,

    #[error("Spatial index queried before it was built")]
    IndexNotBuilt,

    #[error("Cannot resolve fuzzy date '{input}': {reason}")]
    FuzzyDate { input: String, reason: String },

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
}

impl InferenceError {
    pub fn fuzzy_date(input: &str, reason: impl Into<String>) -> Self {
        InferenceError::FuzzyDate {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, InferenceError>;
