//! Generation error types.

use std::path::PathBuf;
use thiserror::Error;

use crate::domain::{ConversionError, LookupError};
use crate::naming::ReleaseNameError;
use crate::pipeline::PipelineError;
use crate::scanner::ScanError;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("{0} is required")]
    MissingOption(&'static str),

    #[error("Component '{component}' belongs to project '{actual}', not '{expected}'")]
    ProjectMismatch {
        component: String,
        actual: String,
        expected: String,
    },

    #[error(
        "Component release '{release}' not found or does not belong to component {project}/{component}"
    )]
    ReleaseNotOwned {
        release: String,
        project: String,
        component: String,
    },

    #[error(
        "No ReleaseBinding found in previous environment '{previous}' for component {project}/{component}; create the binding in '{previous}' first or specify the component release explicitly"
    )]
    MissingPredecessorBinding {
        previous: String,
        project: String,
        component: String,
    },

    #[error("ReleaseBinding '{binding}' in environment '{environment}' has no releaseName")]
    EmptyPredecessorRelease { binding: String, environment: String },

    #[error("ReleaseBinding '{name}' is no longer present in '{path}'")]
    BindingNotInFile { name: String, path: PathBuf },

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    ReleaseName(#[from] ReleaseNameError),

    #[error(transparent)]
    Scan(#[from] ScanError),
}
