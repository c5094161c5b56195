//! The closed set of document kinds the domain layer understands.

use serde::{Deserialize, Serialize};

use super::owner::OwnerRef;
use crate::index::{GroupVersionKind, ResourceEntry};

/// API group of every OpenChoreo resource.
pub const API_GROUP: &str = "openchoreo.dev";

/// Version of every OpenChoreo resource handled here.
pub const API_GROUP_VERSION: &str = "v1alpha1";

/// `apiVersion` written into generated documents.
pub const API_VERSION: &str = "openchoreo.dev/v1alpha1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    Project,
    Component,
    ComponentType,
    Trait,
    Workload,
    ComponentRelease,
    ReleaseBinding,
    DeploymentPipeline,
}

/// Where a document lands in the domain index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DomainSlot {
    ProjectComponent { project: String },
    ComponentWorkload(OwnerRef),
    ComponentType { name: String },
    Trait { name: String },
    ComponentRelease(OwnerRef),
    ReleaseBinding { owner: OwnerRef, environment: String },
    DeploymentPipeline { name: String },
}

impl ResourceKind {
    /// Returns all resource kinds.
    pub fn all() -> &'static [ResourceKind] {
        &[
            ResourceKind::Project,
            ResourceKind::Component,
            ResourceKind::ComponentType,
            ResourceKind::Trait,
            ResourceKind::Workload,
            ResourceKind::ComponentRelease,
            ResourceKind::ReleaseBinding,
            ResourceKind::DeploymentPipeline,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Project => "Project",
            ResourceKind::Component => "Component",
            ResourceKind::ComponentType => "ComponentType",
            ResourceKind::Trait => "Trait",
            ResourceKind::Workload => "Workload",
            ResourceKind::ComponentRelease => "ComponentRelease",
            ResourceKind::ReleaseBinding => "ReleaseBinding",
            ResourceKind::DeploymentPipeline => "DeploymentPipeline",
        }
    }

    pub fn gvk(&self) -> GroupVersionKind {
        GroupVersionKind::new(API_GROUP, API_GROUP_VERSION, self.as_str())
    }

    pub fn from_gvk(gvk: &GroupVersionKind) -> Option<Self> {
        if gvk.group != API_GROUP || gvk.version != API_GROUP_VERSION {
            return None;
        }
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == gvk.kind)
    }

    /// The indexing rule for this kind: which auxiliary mapping a document
    /// belongs to, or `None` if it is not indexed beyond its identity.
    pub(crate) fn slot(&self, entry: &ResourceEntry) -> Option<DomainSlot> {
        let complete_owner = || {
            OwnerRef::from_entry(entry)
                .filter(|owner| !owner.project_name.is_empty() && !owner.component_name.is_empty())
        };

        match self {
            ResourceKind::Project => None,
            ResourceKind::Component => OwnerRef::from_entry(entry)
                .filter(|owner| !owner.project_name.is_empty())
                .map(|owner| DomainSlot::ProjectComponent {
                    project: owner.project_name,
                }),
            ResourceKind::Workload => complete_owner().map(DomainSlot::ComponentWorkload),
            ResourceKind::ComponentType => Some(DomainSlot::ComponentType {
                name: entry.name().to_string(),
            }),
            ResourceKind::Trait => Some(DomainSlot::Trait {
                name: entry.name().to_string(),
            }),
            ResourceKind::ComponentRelease => complete_owner().map(DomainSlot::ComponentRelease),
            ResourceKind::ReleaseBinding => {
                let environment = entry
                    .nested_str(&["spec", "environment"])
                    .filter(|env| !env.is_empty())?;
                complete_owner().map(|owner| DomainSlot::ReleaseBinding {
                    owner,
                    environment: environment.to_string(),
                })
            }
            ResourceKind::DeploymentPipeline => Some(DomainSlot::DeploymentPipeline {
                name: entry.name().to_string(),
            }),
        }
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown resource kind: {}", s))
    }
}
