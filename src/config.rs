use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::aggregate::{GroupKey, RankMetric, DEFAULT_TOP_N};
use crate::errors::ConfigError;
use crate::normalizer::{NormalizeOptions, DEFAULT_NULL_MARKERS};
use crate::utils::CountEncoding;
use crate::validation::AdmissionPolicy;

/// Which name identifies a species in rankings and the species facet.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SpeciesKey {
    #[default]
    CommonName,
    FullName,
}

impl SpeciesKey {
    pub fn field(&self) -> GroupKey {
        match self {
            SpeciesKey::CommonName => GroupKey::CommonName,
            SpeciesKey::FullName => GroupKey::FullName,
        }
    }
}

/// Rows a query ranks: the whole file, or only the rows its selection kept.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RankScope {
    #[default]
    Dataset,
    Selection,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub admission: AdmissionPolicy,
    pub count_encoding: CountEncoding,
    pub null_markers: Vec<String>,
    pub species_key: SpeciesKey,
    pub rank_metric: RankMetric,
    pub rank_scope: RankScope,
    pub top_n: usize,
    pub delimiter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            admission: AdmissionPolicy::default(),
            count_encoding: CountEncoding::default(),
            null_markers: DEFAULT_NULL_MARKERS.iter().map(|s| s.to_string()).collect(),
            species_key: SpeciesKey::default(),
            rank_metric: RankMetric::default(),
            rank_scope: RankScope::default(),
            top_n: DEFAULT_TOP_N,
            delimiter: ",".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn normalize_options(&self) -> NormalizeOptions {
        NormalizeOptions {
            admission: self.admission,
            count_encoding: self.count_encoding,
            null_markers: self.null_markers.clone(),
        }
    }

    /// Delimiter as the single byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> Result<u8, ConfigError> {
        match self.delimiter.as_bytes() {
            [b] => Ok(*b),
            _ => Err(ConfigError::Invalid {
                field: "delimiter".to_string(),
                message: format!("expected a single byte, got '{}'", self.delimiter),
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.top_n == 0 {
            return Err(ConfigError::Invalid {
                field: "top_n".to_string(),
                message: "must be greater than 0".to_string(),
            });
        }
        self.delimiter_byte()?;
        Ok(())
    }
}

/// Loads and validates an engine configuration file. Missing fields take
/// their defaults.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let file = File::open(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let reader = BufReader::new(file);

    let config: EngineConfig =
        serde_json::from_reader(reader).map_err(|e| ConfigError::JsonParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

    config.validate()?;
    log::debug!("Loaded engine configuration from {}", path.display());
    Ok(config)
}
