//! Lookup errors of the domain index.

use thiserror::Error;

use super::typed::ConversionError;
use crate::pipeline::PipelineError;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Component '{name}' not found in namespace '{namespace}'")]
    ComponentNotFound { name: String, namespace: String },

    #[error("Component type '{0}' not found")]
    ComponentTypeNotFound(String),

    #[error("Trait '{0}' not found")]
    TraitNotFound(String),

    #[error("Workload for component '{component}' (project: '{project}') not found")]
    WorkloadNotFound { project: String, component: String },

    #[error("No releases found for component {project}/{component}")]
    NoReleases { project: String, component: String },

    #[error("Project '{name}' not found in namespace '{namespace}'")]
    ProjectNotFound { name: String, namespace: String },

    #[error("Project '{0}' has no deploymentPipelineRef set")]
    MissingPipelineRef(String),

    #[error("Deployment pipeline '{0}' not found")]
    PipelineNotFound(String),

    #[error(transparent)]
    Conversion(#[from] ConversionError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
