//! Output writer.
//!
//! Resolves where an artifact belongs and persists it. Releases are skipped
//! when unchanged and never overwrite an existing file; bindings are written
//! in place.

pub mod compare;
pub mod error;
pub mod resolver;
pub mod writer;

pub use compare::{find_latest_release, release_specs_equal, StoredRelease};
pub use error::OutputError;
pub use resolver::{
    ArtifactKind, IndexOutputResolver, OutputDirResolver, OutputDirSource, OutputPathResolver,
    ResolvedDir,
};
pub use writer::{
    render_documents, BulkWriteResult, OutputWriter, WriteFailure, WriteOptions, WriteOutcome,
};
