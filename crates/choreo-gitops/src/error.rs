use std::path::PathBuf;
use thiserror::Error;

use crate::domain::{ConversionError, LookupError};
use crate::generator::GenerateError;
use crate::index::IndexError;
use crate::logging::LoggingError;
use crate::naming::ReleaseNameError;
use crate::output::OutputError;
use crate::pipeline::PipelineError;
use crate::scanner::{ParseError, ScanError};

#[derive(Error, Debug)]
pub enum ChoreoError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Index error: {0}")]
    Index(#[from] IndexError),

    #[error("Lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Generation error: {0}")]
    Generate(#[from] GenerateError),

    #[error("Output error: {0}")]
    Output(#[from] OutputError),

    #[error("Release name error: {0}")]
    ReleaseName(#[from] ReleaseNameError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

pub type Result<T> = std::result::Result<T, ChoreoError>;
