//! Repository scanning: file selection, document parsing and the worker pool
//! that fills the generic index.

pub mod error;
pub mod filter;
pub mod parser;
pub mod scan;

pub use error::{ParseError, ScanError};
pub use filter::{FileFilter, DEFAULT_EXCLUDE_PATHS, DEFAULT_INCLUDE_EXTENSIONS};
pub use parser::{decode_values, parse_documents, parse_file, validate_resource};
pub use scan::{
    scan_repository, scan_repository_with_options, ErrorHandler, ScanOptions, Scanner,
    DEFAULT_WORKERS,
};
