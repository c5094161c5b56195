//! Shared fixtures for choreo-gitops integration tests.
//!
//! - `RepoFixture` builds a repository tree inside a temp directory
//! - builders produce resource documents for it

pub mod builders;
pub mod fixture;

pub use builders::*;
pub use fixture::RepoFixture;
