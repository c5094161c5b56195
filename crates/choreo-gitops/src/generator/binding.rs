//! ReleaseBinding generation.

use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tracing::{debug, info_span};

use super::error::GenerateError;
use super::{BulkScope, ComponentFailure};
use crate::domain::{DomainIndex, OwnerRef, ReleaseBinding, ResourceKind, API_VERSION};
use crate::index::ResourceEntry;
use crate::pipeline::PipelineInfo;
use crate::scanner::parse_file;

/// Inputs for one binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindingOptions {
    pub project: String,
    pub component: String,
    pub target_environment: String,
    pub namespace: String,
    /// Bind this release instead of selecting one from the pipeline.
    pub component_release: Option<String>,
}

impl BindingOptions {
    pub fn new(
        project: impl Into<String>,
        component: impl Into<String>,
        target_environment: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            component: component.into(),
            target_environment: target_environment.into(),
            namespace: namespace.into(),
            component_release: None,
        }
    }

    pub fn with_component_release(mut self, release: impl Into<String>) -> Self {
        self.component_release = Some(release.into());
        self
    }

    fn validate(&self) -> Result<(), GenerateError> {
        let required = [
            (self.project.as_str(), "project name"),
            (self.component.as_str(), "component name"),
            (self.target_environment.as_str(), "target environment"),
            (self.namespace.as_str(), "namespace"),
        ];
        match required.iter().find(|(value, _)| value.is_empty()) {
            Some(&(_, field)) => Err(GenerateError::MissingOption(field)),
            None => Ok(()),
        }
    }
}

/// A generated or updated binding and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingInfo {
    pub binding_name: String,
    pub project_name: String,
    pub component_name: String,
    pub release_name: String,
    pub environment: String,
    pub binding: Value,
    /// True when an existing binding was updated in place.
    pub is_update: bool,
    /// The file holding the binding being updated.
    pub existing_file_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkBindingOptions {
    pub scope: BulkScope,
    pub target_environment: String,
    pub namespace: String,
}

#[derive(Debug, Default)]
pub struct BulkBindingResult {
    pub bindings: Vec<BindingInfo>,
    pub errors: Vec<ComponentFailure>,
}

/// Links releases to environments of a promotion pipeline.
pub struct BindingGenerator<'a> {
    index: &'a DomainIndex,
}

impl<'a> BindingGenerator<'a> {
    pub fn new(index: &'a DomainIndex) -> Self {
        Self { index }
    }

    /// Creates a binding, or updates the release of the existing one for the
    /// same project, component and environment.
    pub fn generate_binding(
        &self,
        opts: &BindingOptions,
        pipeline: &PipelineInfo,
    ) -> Result<BindingInfo, GenerateError> {
        opts.validate()?;
        let _span = info_span!(
            "generate_binding",
            project = %opts.project,
            component = %opts.component,
            environment = %opts.target_environment
        )
        .entered();

        pipeline.validate_environment(&opts.target_environment)?;
        let release_name = self.select_release(opts, pipeline)?;

        match self
            .index
            .release_binding(&opts.project, &opts.component, &opts.target_environment)
        {
            Some(existing) => self.update_binding(opts, &existing, release_name),
            None => Ok(create_binding(opts, release_name)),
        }
    }

    /// Runs [`Self::generate_binding`] for every component in scope.
    ///
    /// The target environment is checked once up front; an invalid one
    /// fails the whole batch. Per-component failures are collected.
    pub fn generate_bulk_bindings(
        &self,
        opts: &BulkBindingOptions,
        pipeline: &PipelineInfo,
    ) -> Result<BulkBindingResult, GenerateError> {
        if opts.namespace.is_empty() {
            return Err(GenerateError::MissingOption("namespace"));
        }
        pipeline.validate_environment(&opts.target_environment)?;
        let _span = info_span!(
            "generate_bulk_bindings",
            scope = %opts.scope,
            environment = %opts.target_environment
        )
        .entered();

        let components = match &opts.scope {
            BulkScope::All => self.index.all_components(),
            BulkScope::Project(project) => self.index.components_for_project(project),
        };

        let mut result = BulkBindingResult::default();
        for entry in components {
            let Some(owner) = OwnerRef::from_entry(&entry).filter(|o| !o.project_name.is_empty())
            else {
                debug!(component = %entry.name(), "Skipping component without owner");
                continue;
            };
            let binding_opts = BindingOptions::new(
                &owner.project_name,
                &owner.component_name,
                &opts.target_environment,
                &opts.namespace,
            );
            match self.generate_binding(&binding_opts, pipeline) {
                Ok(info) => result.bindings.push(info),
                Err(error) => result.errors.push(ComponentFailure {
                    project: owner.project_name,
                    component: owner.component_name,
                    error,
                }),
            }
        }
        Ok(result)
    }

    /// Explicit release, else latest release for the root environment, else
    /// the release bound in the predecessor environment.
    fn select_release(
        &self,
        opts: &BindingOptions,
        pipeline: &PipelineInfo,
    ) -> Result<String, GenerateError> {
        if let Some(release) = opts.component_release.as_deref().filter(|r| !r.is_empty()) {
            let owned = self
                .index
                .releases_for_component(&opts.project, &opts.component)
                .iter()
                .any(|entry| entry.name() == release);
            if !owned {
                return Err(GenerateError::ReleaseNotOwned {
                    release: release.to_string(),
                    project: opts.project.clone(),
                    component: opts.component.clone(),
                });
            }
            return Ok(release.to_string());
        }

        let Some(previous) = pipeline.previous_environment(&opts.target_environment)? else {
            let latest = self.index.latest_release(&opts.project, &opts.component)?;
            return Ok(latest.name().to_string());
        };

        let predecessor = self
            .index
            .release_binding(&opts.project, &opts.component, &previous)
            .ok_or_else(|| GenerateError::MissingPredecessorBinding {
                previous: previous.clone(),
                project: opts.project.clone(),
                component: opts.component.clone(),
            })?;
        let predecessor = ReleaseBinding::try_from(predecessor.as_ref())?;
        if predecessor.release_name.is_empty() {
            return Err(GenerateError::EmptyPredecessorRelease {
                binding: predecessor.name,
                environment: previous,
            });
        }
        Ok(predecessor.release_name)
    }

    /// Re-reads the binding from disk so fields the index never looks at
    /// survive, then swaps in the new release.
    fn update_binding(
        &self,
        opts: &BindingOptions,
        existing: &ResourceEntry,
        release_name: String,
    ) -> Result<BindingInfo, GenerateError> {
        let path = existing.file_path.clone();
        let on_disk = parse_file(&path)?
            .into_iter()
            .find(|entry| {
                entry.kind() == Some(ResourceKind::ReleaseBinding.as_str())
                    && entry.name() == existing.name()
                    && entry.namespace() == existing.namespace()
            })
            .ok_or_else(|| GenerateError::BindingNotInFile {
                name: existing.name().to_string(),
                path: path.clone(),
            })?;

        let mut binding = on_disk.resource;
        set_release_name(&mut binding, &release_name);
        debug!(binding = %existing.name(), release = %release_name, "Updating existing binding");

        Ok(BindingInfo {
            binding_name: existing.name().to_string(),
            project_name: opts.project.clone(),
            component_name: opts.component.clone(),
            release_name,
            environment: opts.target_environment.clone(),
            binding,
            is_update: true,
            existing_file_path: Some(path),
        })
    }
}

/// Binding name convention: `<component>-<environment>`.
pub fn binding_name(component: &str, environment: &str) -> String {
    format!("{}-{}", component, environment)
}

fn create_binding(opts: &BindingOptions, release_name: String) -> BindingInfo {
    let name = binding_name(&opts.component, &opts.target_environment);
    let binding = json!({
        "apiVersion": API_VERSION,
        "kind": ResourceKind::ReleaseBinding.as_str(),
        "metadata": { "name": name, "namespace": opts.namespace },
        "spec": {
            "owner": { "projectName": opts.project, "componentName": opts.component },
            "environment": opts.target_environment,
            "releaseName": release_name,
        },
    });

    BindingInfo {
        binding_name: name,
        project_name: opts.project.clone(),
        component_name: opts.component.clone(),
        release_name,
        environment: opts.target_environment.clone(),
        binding,
        is_update: false,
        existing_file_path: None,
    }
}

fn set_release_name(binding: &mut Value, release_name: &str) {
    let Some(document) = binding.as_object_mut() else {
        return;
    };
    let spec = document
        .entry("spec")
        .or_insert_with(|| Value::Object(Map::new()));
    if !spec.is_object() {
        *spec = Value::Object(Map::new());
    }
    if let Some(spec) = spec.as_object_mut() {
        spec.insert("releaseName".to_string(), json!(release_name));
    }
}
