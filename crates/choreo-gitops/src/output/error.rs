//! Output error types.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read directory '{path}': {source}")]
    ReadDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse '{path}': {message}")]
    ParseFile { path: PathBuf, message: String },

    #[error("Failed to serialize document: {0}")]
    Serialize(String),

    #[error("Document is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("No free file name for release '{name}' in '{dir}'")]
    NoFreeVersion { name: String, dir: PathBuf },

    #[error("ReleaseBinding '{name}' not found in '{path}'")]
    BindingNotInFile { name: String, path: PathBuf },
}
