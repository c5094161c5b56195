//! Ownership edges between documents and components.

use std::fmt;

use super::kind::ResourceKind;
use crate::index::ResourceEntry;

/// `(project, component)` pair a document belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OwnerRef {
    pub project_name: String,
    pub component_name: String,
}

impl OwnerRef {
    pub fn new(project_name: impl Into<String>, component_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            component_name: component_name.into(),
        }
    }

    /// Reads `spec.owner`. A Component owns itself, so its component name
    /// is its own `metadata.name`.
    ///
    /// Returns `None` when there is no `spec.owner` mapping or both names
    /// are empty.
    pub fn from_entry(entry: &ResourceEntry) -> Option<Self> {
        let owner = entry.nested_map(&["spec", "owner"])?;
        let field = |name: &str| {
            owner
                .get(name)
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string()
        };

        let project_name = field("projectName");
        let component_name = if entry.kind() == Some(ResourceKind::Component.as_str()) {
            entry.name().to_string()
        } else {
            field("componentName")
        };

        if project_name.is_empty() && component_name.is_empty() {
            return None;
        }
        Some(Self {
            project_name,
            component_name,
        })
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project_name, self.component_name)
    }
}
