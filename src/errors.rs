use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::data_models::Column;
use crate::facets::FacetId;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading config file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to parse JSON configuration in {path}: {source}")]
    JsonParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Configuration file not found at {path}")]
    NotFound { path: PathBuf },
    #[error("Invalid configuration value for '{field}': {message}")]
    Invalid { field: String, message: String },
}

/// Errors raised by the CSV adapter. Malformed individual records are not
/// errors; they are logged and skipped.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error reading data file {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Error reading CSV headers in {path}: {source}")]
    HeaderReadError {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("No header row found in {path}")]
    EmptyInput { path: PathBuf },
}

/// Structural failures of the core. Per-row and per-field problems never
/// surface here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Required column '{column}' is missing from every source row")]
    MissingRequiredColumn { column: Column },
    #[error("Facet '{facet}' is not available for this dataset")]
    UnavailableFacet { facet: FacetId },
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration parsing failed: {0}")]
    ConfigParse(#[from] ConfigError),
    #[error("Parsing failed for {1}: {0}")]
    Parse(ParseError, PathBuf),
    #[error("Normalization failed: {0}")]
    Engine(#[from] EngineError),
    #[error("Invalid glob pattern '{pattern}': {message}")]
    Glob { pattern: String, message: String },
}
