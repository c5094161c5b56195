//! Temporary repository trees.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;

use super::builders::*;

pub const PROJECT: &str = "demo";
pub const COMPONENT: &str = "greeter";

/// A repository checked out into a temp directory.
pub struct RepoFixture {
    temp_dir: TempDir,
}

impl RepoFixture {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// A project `demo` with component `greeter`, promoted through
    /// development, staging and production.
    pub fn standard() -> Self {
        let fixture = Self::new();
        fixture.write_docs(
            "platform/pipeline.yaml",
            &[pipeline(
                "default",
                &[("development", "staging"), ("staging", "production")],
            )],
        );
        fixture.write_docs(
            "platform/types.yaml",
            &[component_type("service"), trait_def("autoscaler")],
        );
        fixture.write_docs("projects/demo/project.yaml", &[project(PROJECT, "default")]);
        fixture.write_docs(
            "projects/demo/components/greeter/component.yaml",
            &[component(COMPONENT, PROJECT, &["autoscaler"])],
        );
        fixture.write_docs(
            "projects/demo/components/greeter/workload.yaml",
            &[workload(COMPONENT, PROJECT, "ghcr.io/demo/greeter:1.0")],
        );
        fixture
    }

    pub fn root(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.root().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create fixture directory");
        }
        fs::write(&path, content).expect("Failed to write fixture file");
        path
    }

    /// Writes documents as one YAML stream.
    pub fn write_docs(&self, relative: &str, documents: &[Value]) -> PathBuf {
        let content: Vec<String> = documents
            .iter()
            .map(|doc| serde_yaml::to_string(doc).expect("Failed to render fixture"))
            .collect();
        self.write(relative, &content.join("---\n"))
    }

    pub fn read_yaml(&self, path: &Path) -> Value {
        let content = fs::read_to_string(path).expect("Failed to read output");
        serde_yaml::from_str(&content).expect("Failed to parse output")
    }

    /// Files directly inside `relative`, sorted by name.
    pub fn list(&self, relative: &str) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(self.path(relative))
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| e.file_name().to_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();
        names.sort();
        names
    }
}
