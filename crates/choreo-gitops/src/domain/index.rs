//! Derived lookups over the generic index.

use log::{debug, warn};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use super::error::LookupError;
use super::kind::{DomainSlot, ResourceKind};
use super::owner::OwnerRef;
use super::typed::{Component, ComponentType, Project, Trait, Workload};
use crate::index::{AddOutcome, Index, IndexError, ResourceEntry};
use crate::naming::compare_release_names;
use crate::pipeline::PipelineInfo;
use crate::scanner::{ScanError, Scanner};

type Entries = Vec<Arc<ResourceEntry>>;

#[derive(Debug, Default)]
struct DomainMaps {
    components_by_project: HashMap<String, Entries>,
    workloads_by_component: HashMap<OwnerRef, Arc<ResourceEntry>>,
    component_types: HashMap<String, Arc<ResourceEntry>>,
    traits: HashMap<String, Arc<ResourceEntry>>,
    releases_by_component: HashMap<OwnerRef, Entries>,
    bindings_by_environment: HashMap<(OwnerRef, String), Entries>,
    pipelines: HashMap<String, Arc<ResourceEntry>>,
}

impl DomainMaps {
    fn apply(&mut self, slot: DomainSlot, entry: Arc<ResourceEntry>) {
        match slot {
            DomainSlot::ProjectComponent { project } => self
                .components_by_project
                .entry(project)
                .or_default()
                .push(entry),
            DomainSlot::ComponentWorkload(owner) => {
                self.workloads_by_component.insert(owner, entry);
            }
            DomainSlot::ComponentType { name } => {
                self.component_types.insert(name, entry);
            }
            DomainSlot::Trait { name } => {
                self.traits.insert(name, entry);
            }
            DomainSlot::ComponentRelease(owner) => self
                .releases_by_component
                .entry(owner)
                .or_default()
                .push(entry),
            DomainSlot::ReleaseBinding { owner, environment } => self
                .bindings_by_environment
                .entry((owner, environment))
                .or_default()
                .push(entry),
            DomainSlot::DeploymentPipeline { name } => {
                self.pipelines.insert(name, entry);
            }
        }
    }
}

/// Project, component and pipeline lookups derived from an [`Index`].
///
/// The mappings are rebuilt from the generic index by replaying each kind's
/// indexing rule; all mutation goes through the generic index first.
#[derive(Debug)]
pub struct DomainIndex {
    index: Arc<Index>,
    kinds: Vec<ResourceKind>,
    maps: RwLock<DomainMaps>,
}

impl DomainIndex {
    /// Indexes every kind in [`ResourceKind::all`].
    pub fn new(index: Arc<Index>) -> Self {
        Self::with_kinds(index, ResourceKind::all())
    }

    /// Indexes only the given kinds.
    pub fn with_kinds(index: Arc<Index>, kinds: &[ResourceKind]) -> Self {
        let domain = Self {
            index,
            kinds: kinds.to_vec(),
            maps: RwLock::new(DomainMaps::default()),
        };
        domain.rebuild();
        domain
    }

    pub fn index(&self) -> &Arc<Index> {
        &self.index
    }

    /// Replays every indexed document through its kind's rule.
    ///
    /// Documents are visited in `(file, namespace/name)` order so that
    /// first-match lookups are stable.
    pub fn rebuild(&self) {
        let mut maps = DomainMaps::default();

        for kind in &self.kinds {
            let mut entries = self.index.list(&kind.gvk());
            entries.sort_by(|a, b| {
                a.file_path
                    .cmp(&b.file_path)
                    .then_with(|| a.key().cmp(&b.key()))
            });
            for entry in entries {
                if let Some(slot) = kind.slot(&entry) {
                    maps.apply(slot, entry);
                }
            }
        }

        debug!(
            "Domain index rebuilt: {} projects, {} pipelines",
            maps.components_by_project.len(),
            maps.pipelines.len()
        );

        match self.maps.write() {
            Ok(mut guard) => *guard = maps,
            Err(poisoned) => {
                warn!("Domain index lock was poisoned, recovering");
                *poisoned.into_inner() = maps;
            }
        }
    }

    /// Adds a document to the generic index and refreshes the mappings.
    pub fn add(&self, entry: ResourceEntry) -> Result<AddOutcome, IndexError> {
        let outcome = self.index.add(entry)?;
        self.rebuild();
        Ok(outcome)
    }

    /// Drops every document sourced from `path`.
    pub fn remove_file(&self, path: &Path) -> usize {
        let removed = self.index.remove_entries_for_file(path);
        self.rebuild();
        removed
    }

    /// Re-reads one changed file.
    pub fn rescan_file(&self, scanner: &Scanner, path: &Path) -> Result<usize, ScanError> {
        let result = scanner.rescan_file(&self.index, path);
        self.rebuild();
        result
    }

    pub fn component_entry(&self, namespace: &str, name: &str) -> Option<Arc<ResourceEntry>> {
        self.index
            .get(&ResourceKind::Component.gvk(), namespace, name)
    }

    pub fn component(&self, namespace: &str, name: &str) -> Result<Component, LookupError> {
        let entry =
            self.component_entry(namespace, name)
                .ok_or_else(|| LookupError::ComponentNotFound {
                    name: name.to_string(),
                    namespace: namespace.to_string(),
                })?;
        Ok(Component::try_from(entry.as_ref())?)
    }

    /// Components owned by `project`, sorted by name.
    pub fn components_for_project(&self, project: &str) -> Vec<Arc<ResourceEntry>> {
        let mut components = self
            .read()
            .components_by_project
            .get(project)
            .cloned()
            .unwrap_or_default();
        components.sort_by(|a, b| a.name().cmp(b.name()));
        components
    }

    /// Every component in the index, sorted by owner.
    pub fn all_components(&self) -> Vec<Arc<ResourceEntry>> {
        let mut components = self.index.list(&ResourceKind::Component.gvk());
        components.sort_by_key(|entry| {
            (
                OwnerRef::from_entry(entry).unwrap_or_else(|| OwnerRef::new("", entry.name())),
                entry.namespace().to_string(),
            )
        });
        components
    }

    pub fn component_type(&self, name: &str) -> Result<ComponentType, LookupError> {
        let entry = self
            .read()
            .component_types
            .get(name)
            .cloned()
            .ok_or_else(|| LookupError::ComponentTypeNotFound(name.to_string()))?;
        Ok(ComponentType::try_from(entry.as_ref())?)
    }

    pub fn trait_def(&self, name: &str) -> Result<Trait, LookupError> {
        let entry = self
            .read()
            .traits
            .get(name)
            .cloned()
            .ok_or_else(|| LookupError::TraitNotFound(name.to_string()))?;
        Ok(Trait::try_from(entry.as_ref())?)
    }

    pub fn workload_for_component(
        &self,
        project: &str,
        component: &str,
    ) -> Result<Workload, LookupError> {
        let entry = self
            .read()
            .workloads_by_component
            .get(&OwnerRef::new(project, component))
            .cloned()
            .ok_or_else(|| LookupError::WorkloadNotFound {
                project: project.to_string(),
                component: component.to_string(),
            })?;
        Ok(Workload::try_from(entry.as_ref())?)
    }

    pub fn releases_for_component(&self, project: &str, component: &str) -> Vec<Arc<ResourceEntry>> {
        self.read()
            .releases_by_component
            .get(&OwnerRef::new(project, component))
            .cloned()
            .unwrap_or_default()
    }

    /// The newest release of a component, by release name.
    pub fn latest_release(
        &self,
        project: &str,
        component: &str,
    ) -> Result<Arc<ResourceEntry>, LookupError> {
        self.releases_for_component(project, component)
            .into_iter()
            .max_by(|a, b| compare_release_names(a.name(), b.name()))
            .ok_or_else(|| LookupError::NoReleases {
                project: project.to_string(),
                component: component.to_string(),
            })
    }

    /// The binding of a component to one environment.
    ///
    /// Nothing prevents two bindings for the same pair; the first one in
    /// file order is returned.
    pub fn release_binding(
        &self,
        project: &str,
        component: &str,
        environment: &str,
    ) -> Option<Arc<ResourceEntry>> {
        let key = (OwnerRef::new(project, component), environment.to_string());
        self.read()
            .bindings_by_environment
            .get(&key)
            .and_then(|bindings| bindings.first().cloned())
    }

    /// All bindings of a component across environments.
    pub fn release_bindings_for_component(
        &self,
        project: &str,
        component: &str,
    ) -> Vec<Arc<ResourceEntry>> {
        let owner = OwnerRef::new(project, component);
        let mut bindings: Vec<Arc<ResourceEntry>> = self
            .read()
            .bindings_by_environment
            .iter()
            .filter(|((binding_owner, _), _)| *binding_owner == owner)
            .flat_map(|(_, bindings)| bindings.iter().cloned())
            .collect();
        bindings.sort_by(|a, b| a.file_path.cmp(&b.file_path).then_with(|| a.key().cmp(&b.key())));
        bindings
    }

    pub fn deployment_pipeline(&self, name: &str) -> Result<Arc<ResourceEntry>, LookupError> {
        self.read()
            .pipelines
            .get(name)
            .cloned()
            .ok_or_else(|| LookupError::PipelineNotFound(name.to_string()))
    }

    /// Parsed topology of a pipeline.
    pub fn pipeline_info(&self, name: &str) -> Result<PipelineInfo, LookupError> {
        let entry = self.deployment_pipeline(name)?;
        Ok(PipelineInfo::parse(&entry)?)
    }

    pub fn project(&self, namespace: &str, name: &str) -> Result<Project, LookupError> {
        let entry = self
            .index
            .get(&ResourceKind::Project.gvk(), namespace, name)
            .ok_or_else(|| LookupError::ProjectNotFound {
                name: name.to_string(),
                namespace: namespace.to_string(),
            })?;
        Ok(Project::try_from(entry.as_ref())?)
    }

    /// The pipeline a project deploys through, via `spec.deploymentPipelineRef`.
    pub fn pipeline_for_project(
        &self,
        namespace: &str,
        project: &str,
    ) -> Result<PipelineInfo, LookupError> {
        let project = self.project(namespace, project)?;
        let pipeline = project
            .deployment_pipeline_ref
            .ok_or(LookupError::MissingPipelineRef(project.name))?;
        self.pipeline_info(&pipeline)
    }

    fn read(&self) -> RwLockReadGuard<'_, DomainMaps> {
        match self.maps.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Domain index lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
