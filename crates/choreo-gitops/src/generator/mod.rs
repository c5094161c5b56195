//! Artifact generation: ComponentRelease snapshots and ReleaseBindings.

pub mod binding;
pub mod error;
pub mod release;

use std::fmt;

pub use binding::{
    binding_name, BindingGenerator, BindingInfo, BindingOptions, BulkBindingOptions,
    BulkBindingResult,
};
pub use error::GenerateError;
pub use release::{
    BulkReleaseOptions, BulkReleaseResult, ReleaseGenerator, ReleaseInfo, ReleaseOptions,
};

/// Which components a bulk run covers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum BulkScope {
    #[default]
    All,
    Project(String),
}

impl fmt::Display for BulkScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulkScope::All => write!(f, "all"),
            BulkScope::Project(project) => write!(f, "project/{}", project),
        }
    }
}

/// One component that failed during a bulk run.
#[derive(Debug)]
pub struct ComponentFailure {
    pub project: String,
    pub component: String,
    pub error: GenerateError,
}
