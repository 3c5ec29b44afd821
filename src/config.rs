use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants;
use crate::error::{InferenceError, Result};

/// Environment variable naming an alternative config file.
pub const CONFIG_ENV: &str = "ADDRESS_INFERENCE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "address-inference.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub datasets: DatasetsConfig,
    pub paths: PathsConfig,
    pub matching: MatchingConfig,
}

/// Dataset names; these double as id namespaces.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatasetsConfig {
    pub streets: String,
    pub house_numbers: String,
    pub output: String,
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            streets: constants::STREETS_DATASET.to_string(),
            house_numbers: constants::HOUSE_NUMBERS_DATASET.to_string(),
            output: constants::OUTPUT_DATASET.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Holds one `<dataset>/<dataset>.objects.ndjson` file per input dataset.
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("output"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Only house number objects of this type are matched.
    pub house_number_type: Option<String>,
    pub progress_interval: u64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            house_number_type: Some(constants::ADDRESS_TYPE.to_string()),
            progress_interval: constants::PROGRESS_INTERVAL,
        }
    }
}

impl Config {
    /// Load configuration from `path`, from `$ADDRESS_INFERENCE_CONFIG`, or
    /// from `address-inference.toml`, in that order. Only an explicitly named
    /// file has to exist; otherwise defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let config_path = match explicit {
            Some(path) => path,
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    debug!("No config file found, using defaults");
                    return Ok(Self::default());
                }
                default
            }
        };

        let config_content = fs::read_to_string(&config_path).map_err(|e| {
            InferenceError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        let config = Self::from_toml(&config_content)?;
        info!("Loaded configuration from {}", config_path.display());
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.matching.progress_interval == 0 {
            return Err(InferenceError::Config(
                "matching.progress_interval must be positive".to_string(),
            ));
        }
        Ok(config)
    }

    pub fn dataset_file(&self, dataset: &str) -> PathBuf {
        self.paths
            .data_dir
            .join(dataset)
            .join(format!("{}.objects.ndjson", dataset))
    }

    pub fn streets_file(&self) -> PathBuf {
        self.dataset_file(&self.datasets.streets)
    }

    pub fn house_numbers_file(&self) -> PathBuf {
        self.dataset_file(&self.datasets.house_numbers)
    }

    pub fn inferred_file(&self) -> PathBuf {
        self.paths.output_dir.join(constants::INFERRED_FILE)
    }
}
