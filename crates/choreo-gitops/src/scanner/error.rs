//! Scanner error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::index::IndexError;

/// Errors raised while decoding one file.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to parse YAML in '{path}': {message}")]
    Yaml { path: PathBuf, message: String },

    #[error("Failed to parse JSON in '{path}': {message}")]
    Json { path: PathBuf, message: String },
}

/// Errors that can occur while scanning a repository.
///
/// Only [`ScanError::RootNotFound`] and [`ScanError::NotADirectory`] abort a
/// scan; everything else is handed to the error hook.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Repository root '{path}' does not exist")]
    RootNotFound { path: PathBuf },

    #[error("Repository root '{path}' is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("Failed to walk '{path}': {message}")]
    Walk { path: PathBuf, message: String },

    #[error("Failed to read file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Invalid resource in '{path}': {message}")]
    InvalidResource { path: PathBuf, message: String },

    #[error(transparent)]
    Index(#[from] IndexError),
}
