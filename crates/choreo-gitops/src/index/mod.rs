//! Generic resource index.
//!
//! Stores every parsed document keyed by type identity, namespace and name,
//! and by the file it was read from so single files can be re-scanned.

pub mod entry;
pub mod store;

pub use entry::{GroupVersionKind, ObjectKey, ResourceEntry};
pub use store::{AddOutcome, DuplicateIdentity, Index, IndexError, IndexStats};
