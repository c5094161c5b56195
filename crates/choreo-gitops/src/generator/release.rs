//! ComponentRelease generation.

use chrono::{NaiveDate, Utc};
use serde_json::{json, Map, Value};
use tracing::{debug, info_span};

use super::error::GenerateError;
use super::{BulkScope, ComponentFailure};
use crate::domain::{Component, DomainIndex, LookupError, OwnerRef, ResourceKind, API_VERSION};
use crate::naming::{format_date, next_version, ReleaseName};

/// Inputs for one release.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleaseOptions {
    pub component: String,
    /// When non-empty, must match the component's owning project.
    pub project: String,
    /// Defaults to the component's own namespace.
    pub namespace: String,
    /// Used verbatim when set.
    pub release_name: Option<String>,
    /// Overrides the next free version.
    pub version: Option<u64>,
    /// Defaults to today (UTC).
    pub date: Option<NaiveDate>,
}

impl ReleaseOptions {
    pub fn new(
        component: impl Into<String>,
        project: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            component: component.into(),
            project: project.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn with_release_name(mut self, name: impl Into<String>) -> Self {
        self.release_name = Some(name.into());
        self
    }

    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }
}

/// A generated release and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ReleaseInfo {
    pub release_name: String,
    pub project_name: String,
    pub component_name: String,
    pub namespace: String,
    pub release: Value,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkReleaseOptions {
    pub scope: BulkScope,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Default)]
pub struct BulkReleaseResult {
    pub releases: Vec<ReleaseInfo>,
    pub errors: Vec<ComponentFailure>,
}

/// Composes ComponentRelease documents from index state. Performs no I/O.
pub struct ReleaseGenerator<'a> {
    index: &'a DomainIndex,
}

impl<'a> ReleaseGenerator<'a> {
    pub fn new(index: &'a DomainIndex) -> Self {
        Self { index }
    }

    pub fn generate_release(&self, opts: &ReleaseOptions) -> Result<ReleaseInfo, GenerateError> {
        if opts.component.is_empty() {
            return Err(GenerateError::MissingOption("component name"));
        }
        let _span = info_span!("generate_release", component = %opts.component).entered();

        let component = self.find_component(opts)?;
        let project = component.project_name().to_string();
        if !opts.project.is_empty() && opts.project != project {
            return Err(GenerateError::ProjectMismatch {
                component: component.name.clone(),
                actual: project,
                expected: opts.project.clone(),
            });
        }

        let component_type = self.index.component_type(component.component_type_name())?;
        let workload = self.index.workload_for_component(&project, &component.name)?;

        let mut traits = Map::new();
        for trait_ref in &component.spec.traits {
            if !traits.contains_key(&trait_ref.name) {
                let definition = self.index.trait_def(&trait_ref.name)?;
                traits.insert(definition.name, definition.spec);
            }
        }

        let release_name = self.resolve_release_name(&component.name, opts)?;
        let namespace = if opts.namespace.is_empty() {
            component.namespace.clone()
        } else {
            opts.namespace.clone()
        };

        let mut type_block = Map::new();
        type_block.insert("workloadType".into(), json!(component_type.workload_type));
        if let Some(schema) = component_type.schema {
            type_block.insert("schema".into(), schema);
        }
        if let Some(resources) = component_type.resources {
            type_block.insert("resources".into(), resources);
        }

        let mut spec = Map::new();
        spec.insert(
            "owner".into(),
            json!({ "projectName": project, "componentName": component.name }),
        );
        spec.insert("componentType".into(), Value::Object(type_block));
        spec.insert("workload".into(), workload.release_block());
        if let Some(profile) = component_profile(&component) {
            spec.insert("componentProfile".into(), profile);
        }
        if !traits.is_empty() {
            spec.insert("traits".into(), Value::Object(traits));
        }

        let release = json!({
            "apiVersion": API_VERSION,
            "kind": ResourceKind::ComponentRelease.as_str(),
            "metadata": { "name": release_name, "namespace": namespace },
            "spec": spec,
        });

        debug!(release = %release_name, "Generated component release");
        Ok(ReleaseInfo {
            release_name,
            project_name: project,
            component_name: component.name,
            namespace,
            release,
        })
    }

    /// Generates a release for every component in scope. A failing component
    /// is recorded and the rest still run.
    pub fn generate_bulk_releases(&self, opts: &BulkReleaseOptions) -> BulkReleaseResult {
        let _span = info_span!("generate_bulk_releases", scope = %opts.scope).entered();
        let components = match &opts.scope {
            BulkScope::All => self.index.all_components(),
            BulkScope::Project(project) => self.index.components_for_project(project),
        };

        let mut result = BulkReleaseResult::default();
        for entry in components {
            let Some(owner) = OwnerRef::from_entry(&entry) else {
                debug!(component = %entry.name(), "Skipping component without owner");
                continue;
            };
            let release_opts = ReleaseOptions {
                date: opts.date,
                ..ReleaseOptions::new(&owner.component_name, &owner.project_name, entry.namespace())
            };
            match self.generate_release(&release_opts) {
                Ok(info) => result.releases.push(info),
                Err(error) => result.errors.push(ComponentFailure {
                    project: owner.project_name,
                    component: owner.component_name,
                    error,
                }),
            }
        }
        result
    }

    /// Explicit name, else `<component>-<date>-<version>` with the version
    /// either given or one past the highest indexed for that day.
    pub fn resolve_release_name(
        &self,
        component: &str,
        opts: &ReleaseOptions,
    ) -> Result<String, GenerateError> {
        if let Some(name) = opts.release_name.as_deref().filter(|n| !n.is_empty()) {
            return Ok(name.to_string());
        }

        let date = format_date(opts.date.unwrap_or_else(|| Utc::now().date_naive()));
        let version = match opts.version {
            Some(version) => version,
            None => {
                let releases = self
                    .index
                    .index()
                    .list(&ResourceKind::ComponentRelease.gvk());
                next_version(component, &date, releases.iter().map(|r| r.name()))?
            }
        };

        Ok(ReleaseName {
            component: component.to_string(),
            date,
            version,
        }
        .to_string())
    }

    fn find_component(&self, opts: &ReleaseOptions) -> Result<Component, GenerateError> {
        if !opts.namespace.is_empty() {
            return Ok(self.index.component(&opts.namespace, &opts.component)?);
        }

        // Without a namespace, accept a single match across namespaces.
        let mut matches = self
            .index
            .all_components()
            .into_iter()
            .filter(|entry| entry.name() == opts.component);
        match (matches.next(), matches.next()) {
            (Some(entry), None) => Ok(Component::try_from(entry.as_ref())?),
            (None, _) => Err(LookupError::ComponentNotFound {
                name: opts.component.clone(),
                namespace: String::new(),
            }
            .into()),
            // Same name in several namespaces.
            (Some(_), Some(_)) => Err(GenerateError::MissingOption("namespace")),
        }
    }
}

/// The profile block: the component's own parameters plus its trait
/// instantiations. `None` when both are empty.
fn component_profile(component: &Component) -> Option<Value> {
    let mut profile = Map::new();

    if let Some(parameters) = component.spec.parameters.as_ref().filter(|p| is_non_empty(p)) {
        profile.insert("parameters".into(), parameters.clone());
    }

    let traits: Vec<Value> = component
        .spec
        .traits
        .iter()
        .map(|trait_ref| {
            let mut instance = Map::new();
            instance.insert("name".into(), json!(trait_ref.name));
            if !trait_ref.instance_name.is_empty() {
                instance.insert("instanceName".into(), json!(trait_ref.instance_name));
            }
            if let Some(parameters) = trait_ref.parameters.as_ref().filter(|p| is_non_empty(p)) {
                instance.insert("parameters".into(), parameters.clone());
            }
            Value::Object(instance)
        })
        .collect();
    if !traits.is_empty() {
        profile.insert("traits".into(), Value::Array(traits));
    }

    (!profile.is_empty()).then_some(Value::Object(profile))
}

fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Object(map) => !map.is_empty(),
        Value::Array(items) => !items.is_empty(),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Index, ResourceEntry};
    use crate::naming::ReleaseNameError;
    use std::sync::Arc;

    fn doc(kind: &str, name: &str, spec: Value) -> ResourceEntry {
        ResourceEntry::new(
            json!({
                "apiVersion": API_VERSION,
                "kind": kind,
                "metadata": { "name": name, "namespace": "default" },
                "spec": spec
            }),
            format!("/repo/{}-{}.yaml", kind.to_lowercase(), name),
        )
    }

    fn domain(extra: Vec<ResourceEntry>) -> DomainIndex {
        let index = Index::new("/repo");
        let mut docs = vec![
            doc(
                "Component",
                "greeter",
                json!({
                    "owner": { "projectName": "demo" },
                    "componentType": "deployment/service",
                    "parameters": { "replicas": 2 },
                    "traits": [
                        { "name": "ingress", "instanceName": "public", "parameters": { "host": "greeter.local" } },
                        { "name": "ingress", "instanceName": "internal" }
                    ]
                }),
            ),
            doc(
                "Component",
                "plain",
                json!({ "owner": { "projectName": "demo" }, "componentType": "service" }),
            ),
            doc(
                "ComponentType",
                "service",
                json!({ "workloadType": "deployment", "schema": { "parameters": {} }, "resources": [{ "id": "deployment" }] }),
            ),
            doc("Trait", "ingress", json!({ "schema": { "host": "string" } })),
            doc(
                "Workload",
                "greeter",
                json!({
                    "owner": { "projectName": "demo", "componentName": "greeter" },
                    "container": { "image": "greeter:1.0" }
                }),
            ),
            doc(
                "Workload",
                "plain",
                json!({
                    "owner": { "projectName": "demo", "componentName": "plain" },
                    "container": { "image": "plain:1.0" }
                }),
            ),
        ];
        docs.extend(extra);
        for d in docs {
            index.add(d).unwrap();
        }
        DomainIndex::new(Arc::new(index))
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
    }

    #[test]
    fn test_generate_release_document() {
        let domain = domain(vec![]);
        let generator = ReleaseGenerator::new(&domain);
        let info = generator
            .generate_release(&ReleaseOptions::new("greeter", "demo", "default").with_date(date()))
            .unwrap();

        assert_eq!(info.release_name, "greeter-20250115-0");
        assert_eq!(info.project_name, "demo");
        let release = &info.release;
        assert_eq!(release["kind"], "ComponentRelease");
        assert_eq!(release["metadata"]["name"], "greeter-20250115-0");
        assert_eq!(release["metadata"]["namespace"], "default");
        assert_eq!(release["spec"]["owner"]["componentName"], "greeter");
        assert_eq!(release["spec"]["componentType"]["workloadType"], "deployment");
        assert_eq!(release["spec"]["componentType"]["resources"][0]["id"], "deployment");
        assert_eq!(release["spec"]["workload"]["container"]["image"], "greeter:1.0");
        assert_eq!(release["spec"]["componentProfile"]["parameters"]["replicas"], 2);

        let profile_traits = release["spec"]["componentProfile"]["traits"].as_array().unwrap();
        assert_eq!(profile_traits.len(), 2);
        assert_eq!(profile_traits[0]["parameters"]["host"], "greeter.local");
        assert!(profile_traits[1].get("parameters").is_none());

        let traits = release["spec"]["traits"].as_object().unwrap();
        assert_eq!(traits.len(), 1);
        assert_eq!(traits["ingress"]["schema"]["host"], "string");
    }

    #[test]
    fn test_minimal_release_omits_profile_and_traits() {
        let domain = domain(vec![]);
        let info = ReleaseGenerator::new(&domain)
            .generate_release(&ReleaseOptions::new("plain", "demo", "default").with_date(date()))
            .unwrap();
        let spec = info.release["spec"].as_object().unwrap();
        assert!(!spec.contains_key("componentProfile"));
        assert!(!spec.contains_key("traits"));
    }

    #[test]
    fn test_version_follows_existing_releases() {
        let domain = domain(vec![
            doc(
                "ComponentRelease",
                "greeter-20250115-3",
                json!({ "owner": { "projectName": "demo", "componentName": "greeter" } }),
            ),
            doc(
                "ComponentRelease",
                "greeter-20250114-8",
                json!({ "owner": { "projectName": "demo", "componentName": "greeter" } }),
            ),
        ]);
        let generator = ReleaseGenerator::new(&domain);
        let opts = ReleaseOptions::new("greeter", "demo", "default").with_date(date());
        assert_eq!(
            generator.resolve_release_name("greeter", &opts).unwrap(),
            "greeter-20250115-4"
        );
        assert_eq!(
            generator
                .resolve_release_name("greeter", &opts.clone().with_version(7))
                .unwrap(),
            "greeter-20250115-7"
        );
        assert_eq!(
            generator
                .resolve_release_name("greeter", &opts.with_release_name("custom"))
                .unwrap(),
            "custom"
        );
    }

    #[test]
    fn test_version_past_u32_range() {
        let domain = domain(vec![doc(
            "ComponentRelease",
            "greeter-20250115-4294967295",
            json!({ "owner": { "projectName": "demo", "componentName": "greeter" } }),
        )]);
        let info = ReleaseGenerator::new(&domain)
            .generate_release(&ReleaseOptions::new("greeter", "demo", "default").with_date(date()))
            .unwrap();
        assert_eq!(info.release_name, "greeter-20250115-4294967296");
    }

    #[test]
    fn test_exhausted_version_is_an_error() {
        let domain = domain(vec![doc(
            "ComponentRelease",
            &format!("greeter-20250115-{}", u64::MAX),
            json!({ "owner": { "projectName": "demo", "componentName": "greeter" } }),
        )]);
        let err = ReleaseGenerator::new(&domain)
            .generate_release(&ReleaseOptions::new("greeter", "demo", "default").with_date(date()))
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::ReleaseName(ReleaseNameError::VersionExhausted(_))
        ));
    }

    #[test]
    fn test_component_lookup_without_namespace() {
        let domain = domain(vec![]);
        let generator = ReleaseGenerator::new(&domain);

        let info = generator
            .generate_release(&ReleaseOptions::new("greeter", "", "").with_date(date()))
            .unwrap();
        assert_eq!(info.namespace, "default");

        let err = generator
            .generate_release(&ReleaseOptions::new("nope", "", ""))
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Lookup(LookupError::ComponentNotFound { ref name, .. }) if name == "nope"
        ));

        let index = Arc::clone(domain.index());
        index
            .add(ResourceEntry::new(
                json!({
                    "apiVersion": API_VERSION,
                    "kind": "Component",
                    "metadata": { "name": "greeter", "namespace": "staging" },
                    "spec": { "owner": { "projectName": "demo" }, "componentType": "service" }
                }),
                "/repo/staging/greeter.yaml",
            ))
            .unwrap();
        let shared = DomainIndex::new(index);
        let err = ReleaseGenerator::new(&shared)
            .generate_release(&ReleaseOptions::new("greeter", "", ""))
            .unwrap_err();
        assert!(matches!(err, GenerateError::MissingOption("namespace")));
    }

    #[test]
    fn test_missing_dependencies() {
        let domain = domain(vec![doc(
            "Component",
            "broken",
            json!({
                "owner": { "projectName": "demo" },
                "componentType": "missing-type"
            }),
        )]);
        let generator = ReleaseGenerator::new(&domain);

        let err = generator
            .generate_release(&ReleaseOptions::new("nope", "demo", "default"))
            .unwrap_err();
        assert!(err.to_string().contains("Component 'nope' not found"));

        let err = generator
            .generate_release(&ReleaseOptions::new("broken", "demo", "default"))
            .unwrap_err();
        assert!(err.to_string().contains("Component type 'missing-type' not found"));
    }

    #[test]
    fn test_missing_trait_and_workload() {
        let domain = domain(vec![
            doc(
                "Component",
                "traitless",
                json!({
                    "owner": { "projectName": "demo" },
                    "componentType": "service",
                    "traits": [{ "name": "autoscaler" }]
                }),
            ),
            doc(
                "Component",
                "headless",
                json!({ "owner": { "projectName": "demo" }, "componentType": "service" }),
            ),
        ]);
        let generator = ReleaseGenerator::new(&domain);

        let err = generator
            .generate_release(&ReleaseOptions::new("headless", "demo", "default"))
            .unwrap_err();
        assert!(err.to_string().contains("Workload for component 'headless'"));

        let domain_with_workload = {
            let index = Arc::clone(domain.index());
            index
                .add(doc(
                    "Workload",
                    "traitless",
                    json!({
                        "owner": { "projectName": "demo", "componentName": "traitless" },
                        "container": { "image": "t:1" }
                    }),
                ))
                .unwrap();
            DomainIndex::new(index)
        };
        let err = ReleaseGenerator::new(&domain_with_workload)
            .generate_release(&ReleaseOptions::new("traitless", "demo", "default"))
            .unwrap_err();
        assert!(err.to_string().contains("Trait 'autoscaler' not found"));
    }

    #[test]
    fn test_project_mismatch() {
        let domain = domain(vec![]);
        let err = ReleaseGenerator::new(&domain)
            .generate_release(&ReleaseOptions::new("greeter", "other", "default"))
            .unwrap_err();
        assert!(matches!(err, GenerateError::ProjectMismatch { .. }));
    }

    #[test]
    fn test_bulk_releases_collect_failures() {
        let domain = domain(vec![doc(
            "Component",
            "broken",
            json!({ "owner": { "projectName": "demo" }, "componentType": "missing-type" }),
        )]);
        let result = ReleaseGenerator::new(&domain).generate_bulk_releases(&BulkReleaseOptions {
            scope: BulkScope::Project("demo".to_string()),
            date: Some(date()),
        });

        let names: Vec<&str> = result.releases.iter().map(|r| r.release_name.as_str()).collect();
        assert_eq!(names, vec!["greeter-20250115-0", "plain-20250115-0"]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].component, "broken");
    }
}
