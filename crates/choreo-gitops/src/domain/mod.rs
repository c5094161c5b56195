//! OpenChoreo domain layer: resource kinds, ownership, typed views and the
//! derived lookup index used by the generators.

pub mod error;
pub mod index;
pub mod kind;
pub mod owner;
pub mod typed;

pub use error::LookupError;
pub use index::DomainIndex;
pub use kind::{ResourceKind, API_GROUP, API_GROUP_VERSION, API_VERSION};
pub use owner::OwnerRef;
pub use typed::{
    Component, ComponentSpec, ComponentTraitRef, ComponentType, ConversionError,
    DeploymentPipelineSpec, NameRef, OwnerSpec, Project, PromotionPath, ReleaseBinding, Trait,
    Workload,
};
