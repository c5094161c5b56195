//! Resource document builders.

#![allow(dead_code)]

use serde_json::{json, Value};

pub const NAMESPACE: &str = "default";

pub fn resource(kind: &str, name: &str, spec: Value) -> Value {
    json!({
        "apiVersion": "openchoreo.dev/v1alpha1",
        "kind": kind,
        "metadata": { "name": name, "namespace": NAMESPACE },
        "spec": spec
    })
}

pub fn owner(project: &str, component: &str) -> Value {
    json!({ "projectName": project, "componentName": component })
}

pub fn project(name: &str, pipeline: &str) -> Value {
    resource("Project", name, json!({ "deploymentPipelineRef": pipeline }))
}

/// A pipeline with one promotion path per `(source, target)` edge.
pub fn pipeline(name: &str, edges: &[(&str, &str)]) -> Value {
    let paths: Vec<Value> = edges
        .iter()
        .map(|(source, target)| {
            json!({
                "sourceEnvironmentRef": source,
                "targetEnvironmentRefs": [{ "name": target }]
            })
        })
        .collect();
    resource("DeploymentPipeline", name, json!({ "promotionPaths": paths }))
}

pub fn component_type(name: &str) -> Value {
    resource(
        "ComponentType",
        name,
        json!({
            "workloadType": "deployment",
            "schema": { "parameters": { "replicas": "integer | default=1" } }
        }),
    )
}

pub fn trait_def(name: &str) -> Value {
    resource(
        "Trait",
        name,
        json!({ "schema": { "parameters": { "minReplicas": "integer" } } }),
    )
}

pub fn component(name: &str, project: &str, traits: &[&str]) -> Value {
    let traits: Vec<Value> = traits
        .iter()
        .map(|t| json!({ "name": t, "instanceName": format!("{}-1", t) }))
        .collect();
    resource(
        "Component",
        name,
        json!({
            "owner": { "projectName": project },
            "componentType": "deployment/service",
            "parameters": { "replicas": 2 },
            "traits": traits
        }),
    )
}

pub fn workload(component: &str, project: &str, image: &str) -> Value {
    resource(
        "Workload",
        &format!("{}-workload", component),
        json!({
            "owner": owner(project, component),
            "containers": { "main": { "image": image } }
        }),
    )
}

pub fn release(name: &str, project: &str, component: &str) -> Value {
    resource(
        "ComponentRelease",
        name,
        json!({ "owner": owner(project, component) }),
    )
}

pub fn binding(project: &str, component: &str, environment: &str, release: &str) -> Value {
    resource(
        "ReleaseBinding",
        &format!("{}-{}", component, environment),
        json!({
            "owner": owner(project, component),
            "environment": environment,
            "releaseName": release
        }),
    )
}
