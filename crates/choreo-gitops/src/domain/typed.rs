//! Strongly shaped views over indexed documents.
//!
//! Each view is produced by an explicit `TryFrom<&ResourceEntry>` conversion
//! that deserializes the `spec` subtree and fails with a [`ConversionError`]
//! naming the offending document.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use thiserror::Error;

use crate::index::ResourceEntry;

#[derive(Error, Debug)]
#[error("Cannot read {kind} '{name}' from '{path}': {message}")]
pub struct ConversionError {
    pub kind: String,
    pub name: String,
    pub path: PathBuf,
    pub message: String,
}

impl ConversionError {
    fn new(entry: &ResourceEntry, message: impl Into<String>) -> Self {
        Self {
            kind: entry.kind().unwrap_or_default().to_string(),
            name: entry.name().to_string(),
            path: entry.file_path.clone(),
            message: message.into(),
        }
    }
}

/// A reference by name, written either as a plain string or as `{name: ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum NameRef {
    Name(String),
    Object {
        #[serde(default)]
        name: String,
    },
}

impl NameRef {
    pub fn as_str(&self) -> &str {
        match self {
            NameRef::Name(name) => name,
            NameRef::Object { name } => name,
        }
    }
}

impl Default for NameRef {
    fn default() -> Self {
        NameRef::Name(String::new())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerSpec {
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub component_name: String,
}

/// A trait instantiation listed on a component.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentTraitRef {
    pub name: String,
    #[serde(default)]
    pub instance_name: String,
    #[serde(default)]
    pub parameters: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentSpec {
    #[serde(default)]
    pub owner: OwnerSpec,
    pub component_type: NameRef,
    #[serde(default)]
    pub parameters: Option<Value>,
    #[serde(default)]
    pub traits: Vec<ComponentTraitRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub name: String,
    pub namespace: String,
    pub spec: ComponentSpec,
}

impl Component {
    pub fn project_name(&self) -> &str {
        &self.spec.owner.project_name
    }

    /// The referenced component type, without any `workloadType/` prefix.
    pub fn component_type_name(&self) -> &str {
        let reference = self.spec.component_type.as_str();
        reference
            .rsplit_once('/')
            .map(|(_, name)| name)
            .unwrap_or(reference)
    }
}

impl TryFrom<&ResourceEntry> for Component {
    type Error = ConversionError;

    fn try_from(entry: &ResourceEntry) -> Result<Self, Self::Error> {
        let spec: ComponentSpec = spec_of(entry)?;
        let component = Self {
            name: entry.name().to_string(),
            namespace: entry.namespace().to_string(),
            spec,
        };
        if component.component_type_name().is_empty() {
            return Err(ConversionError::new(entry, "spec.componentType is empty"));
        }
        Ok(component)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComponentTypeSpec {
    workload_type: String,
    #[serde(default)]
    schema: Option<Value>,
    #[serde(default)]
    resources: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentType {
    pub name: String,
    pub workload_type: String,
    pub schema: Option<Value>,
    pub resources: Option<Value>,
}

impl TryFrom<&ResourceEntry> for ComponentType {
    type Error = ConversionError;

    fn try_from(entry: &ResourceEntry) -> Result<Self, Self::Error> {
        let spec: ComponentTypeSpec = spec_of(entry)?;
        if spec.workload_type.is_empty() {
            return Err(ConversionError::new(entry, "spec.workloadType is empty"));
        }
        Ok(Self {
            name: entry.name().to_string(),
            workload_type: spec.workload_type,
            schema: spec.schema,
            resources: spec.resources,
        })
    }
}

/// A trait definition; its spec is carried verbatim into releases.
#[derive(Debug, Clone, PartialEq)]
pub struct Trait {
    pub name: String,
    pub spec: Value,
}

impl TryFrom<&ResourceEntry> for Trait {
    type Error = ConversionError;

    fn try_from(entry: &ResourceEntry) -> Result<Self, Self::Error> {
        let spec = match entry.spec() {
            None => Value::Object(Map::new()),
            Some(spec @ Value::Object(_)) => spec.clone(),
            Some(_) => return Err(ConversionError::new(entry, "spec is not a mapping")),
        };
        Ok(Self {
            name: entry.name().to_string(),
            spec,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkloadSpec {
    #[serde(default)]
    owner: OwnerSpec,
    #[serde(default)]
    container: Option<Value>,
    #[serde(default)]
    containers: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Workload {
    pub name: String,
    pub owner: OwnerSpec,
    pub container: Option<Value>,
    pub containers: Option<Value>,
}

impl Workload {
    /// The block embedded into releases: `{container: ...}` or `{containers: ...}`.
    pub fn release_block(&self) -> Value {
        let mut block = Map::new();
        if let Some(container) = &self.container {
            block.insert("container".to_string(), container.clone());
        }
        if let Some(containers) = &self.containers {
            block.insert("containers".to_string(), containers.clone());
        }
        Value::Object(block)
    }
}

impl TryFrom<&ResourceEntry> for Workload {
    type Error = ConversionError;

    fn try_from(entry: &ResourceEntry) -> Result<Self, Self::Error> {
        let spec: WorkloadSpec = spec_of(entry)?;
        if spec.container.is_none() && spec.containers.is_none() {
            return Err(ConversionError::new(entry, "workload defines no container"));
        }
        Ok(Self {
            name: entry.name().to_string(),
            owner: spec.owner,
            container: spec.container,
            containers: spec.containers,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReleaseBindingSpec {
    #[serde(default)]
    owner: OwnerSpec,
    #[serde(default)]
    environment: String,
    #[serde(default)]
    release_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseBinding {
    pub name: String,
    pub namespace: String,
    pub owner: OwnerSpec,
    pub environment: String,
    pub release_name: String,
}

impl TryFrom<&ResourceEntry> for ReleaseBinding {
    type Error = ConversionError;

    fn try_from(entry: &ResourceEntry) -> Result<Self, Self::Error> {
        let spec: ReleaseBindingSpec = spec_of(entry)?;
        Ok(Self {
            name: entry.name().to_string(),
            namespace: entry.namespace().to_string(),
            owner: spec.owner,
            environment: spec.environment,
            release_name: spec.release_name,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectSpec {
    #[serde(default)]
    deployment_pipeline_ref: Option<NameRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub name: String,
    pub namespace: String,
    pub deployment_pipeline_ref: Option<String>,
}

impl TryFrom<&ResourceEntry> for Project {
    type Error = ConversionError;

    fn try_from(entry: &ResourceEntry) -> Result<Self, Self::Error> {
        let spec: ProjectSpec = spec_of(entry)?;
        Ok(Self {
            name: entry.name().to_string(),
            namespace: entry.namespace().to_string(),
            deployment_pipeline_ref: spec
                .deployment_pipeline_ref
                .map(|r| r.as_str().to_string())
                .filter(|r| !r.is_empty()),
        })
    }
}

/// One `spec.promotionPaths` item of a DeploymentPipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromotionPath {
    #[serde(default)]
    pub source_environment_ref: NameRef,
    #[serde(default)]
    pub target_environment_refs: Vec<NameRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPipelineSpec {
    #[serde(default)]
    pub promotion_paths: Vec<PromotionPath>,
}

impl TryFrom<&ResourceEntry> for DeploymentPipelineSpec {
    type Error = ConversionError;

    fn try_from(entry: &ResourceEntry) -> Result<Self, Self::Error> {
        spec_of(entry)
    }
}

fn spec_of<T: DeserializeOwned>(entry: &ResourceEntry) -> Result<T, ConversionError> {
    let spec = entry
        .spec()
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    serde_json::from_value(spec).map_err(|e| ConversionError::new(entry, e.to_string()))
}
