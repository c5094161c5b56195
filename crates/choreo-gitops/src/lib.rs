//! Filesystem index and artifact generation for OpenChoreo GitOps repositories.
//!
//! A repository tree of YAML/JSON resource documents is scanned into a
//! generic [`Index`], projected into a [`DomainIndex`] of projects,
//! components, releases, bindings and pipelines, and used to generate
//! ComponentRelease and ReleaseBinding documents that the [`OutputWriter`]
//! persists back into the tree.

pub mod config;
pub mod domain;
pub mod error;
pub mod generator;
pub mod index;
pub mod logging;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod repository;
pub mod scanner;

pub use config::{ReleaseConfig, RELEASE_CONFIG_FILE_NAME};
pub use domain::{DomainIndex, LookupError, ResourceKind, API_VERSION};
pub use error::{ChoreoError, ConfigError, Result};
pub use generator::{
    BindingGenerator, BindingInfo, BindingOptions, BulkBindingOptions, BulkReleaseOptions,
    BulkScope, GenerateError, ReleaseGenerator, ReleaseInfo, ReleaseOptions,
};
pub use index::{GroupVersionKind, Index, IndexError, ResourceEntry};
pub use logging::{LogConfig, LogFormat};
pub use naming::{ReleaseName, ReleaseNameError};
pub use output::{
    ArtifactKind, IndexOutputResolver, OutputDirResolver, OutputError, OutputWriter, WriteOptions,
    WriteOutcome,
};
pub use pipeline::{PipelineError, PipelineInfo};
pub use repository::GitOpsRepository;
pub use scanner::{scan_repository, FileFilter, ParseError, ScanError, ScanOptions, Scanner};
