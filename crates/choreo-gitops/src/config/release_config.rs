//! The optional `release-config.yaml` sidecar that pins output directories.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::API_VERSION;
use crate::error::ConfigError;

/// File name looked up at the repository root.
pub const RELEASE_CONFIG_FILE_NAME: &str = "release-config.yaml";

pub const RELEASE_CONFIG_KIND: &str = "ReleaseConfig";

/// Which level of the sidecar supplied a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigTier {
    ComponentOverride,
    ProjectDefault,
    GlobalDefault,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseConfig {
    #[serde(default)]
    pub api_version: String,

    #[serde(default)]
    pub kind: String,

    /// Output directories for ComponentRelease files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_release_defaults: Option<OutputDefaults>,

    /// Output directories for ReleaseBinding files.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_binding_defaults: Option<OutputDefaults>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputDefaults {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_output_dir: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub projects: BTreeMap<String, ProjectOutputConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectOutputConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub default_output_dir: String,

    /// Component name to directory.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, String>,
}

impl OutputDefaults {
    /// Most specific configured directory: component, then project, then global.
    pub fn output_dir(&self, project: &str, component: &str) -> Option<(ConfigTier, &str)> {
        let project_config = self.projects.get(project);

        project_config
            .and_then(|p| p.components.get(component))
            .filter(|dir| !dir.is_empty())
            .map(|dir| (ConfigTier::ComponentOverride, dir.as_str()))
            .or_else(|| {
                project_config
                    .map(|p| p.default_output_dir.as_str())
                    .filter(|dir| !dir.is_empty())
                    .map(|dir| (ConfigTier::ProjectDefault, dir))
            })
            .or_else(|| {
                Some(self.default_output_dir.as_str())
                    .filter(|dir| !dir.is_empty())
                    .map(|dir| (ConfigTier::GlobalDefault, dir))
            })
    }
}

impl ReleaseConfig {
    /// Reads and validates a sidecar file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        let config: ReleaseConfig =
            serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `release-config.yaml` from the repository root if it exists.
    pub fn load_from_repo(repo_root: &Path) -> Result<Option<Self>, ConfigError> {
        let path = repo_root.join(RELEASE_CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }
        Self::load(&path).map(Some)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_version.is_empty() {
            return Err(ConfigError::Validation {
                message: "apiVersion is required".to_string(),
            });
        }
        if self.kind.is_empty() {
            return Err(ConfigError::Validation {
                message: "kind is required".to_string(),
            });
        }
        if self.api_version != API_VERSION {
            return Err(ConfigError::Validation {
                message: format!(
                    "unsupported apiVersion '{}', expected '{}'",
                    self.api_version, API_VERSION
                ),
            });
        }
        if self.kind != RELEASE_CONFIG_KIND {
            return Err(ConfigError::Validation {
                message: format!(
                    "unsupported kind '{}', expected '{}'",
                    self.kind, RELEASE_CONFIG_KIND
                ),
            });
        }
        Ok(())
    }

    pub fn release_output_dir(&self, project: &str, component: &str) -> Option<(ConfigTier, &str)> {
        self.component_release_defaults
            .as_ref()
            .and_then(|defaults| defaults.output_dir(project, component))
    }

    pub fn binding_output_dir(&self, project: &str, component: &str) -> Option<(ConfigTier, &str)> {
        self.release_binding_defaults
            .as_ref()
            .and_then(|defaults| defaults.output_dir(project, component))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const FULL_CONFIG: &str = r#"
apiVersion: openchoreo.dev/v1alpha1
kind: ReleaseConfig
componentReleaseDefaults:
  defaultOutputDir: ./releases
  projects:
    demo-project:
      defaultOutputDir: ./demo/releases
      components:
        greeter: ./demo/greeter/releases
releaseBindingDefaults:
  defaultOutputDir: ./bindings
"#;

    fn write_config(content: &str) -> (TempDir, std::path::PathBuf) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(RELEASE_CONFIG_FILE_NAME);
        fs::write(&path, content).unwrap();
        (temp, path)
    }

    #[test]
    fn test_load_full_config() {
        let (_temp, path) = write_config(FULL_CONFIG);
        let config = ReleaseConfig::load(&path).unwrap();

        assert_eq!(
            config.release_output_dir("demo-project", "greeter"),
            Some((ConfigTier::ComponentOverride, "./demo/greeter/releases"))
        );
        assert_eq!(
            config.release_output_dir("demo-project", "other"),
            Some((ConfigTier::ProjectDefault, "./demo/releases"))
        );
        assert_eq!(
            config.release_output_dir("elsewhere", "greeter"),
            Some((ConfigTier::GlobalDefault, "./releases"))
        );
        assert_eq!(
            config.binding_output_dir("demo-project", "greeter"),
            Some((ConfigTier::GlobalDefault, "./bindings"))
        );
    }

    #[test]
    fn test_missing_sections_resolve_to_none() {
        let config = ReleaseConfig {
            api_version: API_VERSION.to_string(),
            kind: RELEASE_CONFIG_KIND.to_string(),
            ..Default::default()
        };
        assert_eq!(config.release_output_dir("p", "c"), None);
        assert_eq!(config.binding_output_dir("p", "c"), None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let cases = [
            ("kind: ReleaseConfig\n", "apiVersion is required"),
            ("apiVersion: openchoreo.dev/v1alpha1\n", "kind is required"),
            ("apiVersion: v2\nkind: ReleaseConfig\n", "unsupported apiVersion"),
            (
                "apiVersion: openchoreo.dev/v1alpha1\nkind: Something\n",
                "unsupported kind",
            ),
        ];
        for (content, expected) in cases {
            let (_temp, path) = write_config(content);
            let err = ReleaseConfig::load(&path).unwrap_err();
            assert!(
                err.to_string().contains(expected),
                "expected '{}' in '{}'",
                expected,
                err
            );
        }
    }

    #[test]
    fn test_load_errors() {
        let missing = ReleaseConfig::load(Path::new("/nonexistent/release-config.yaml"));
        assert!(matches!(missing, Err(ConfigError::ReadFile { .. })));

        let (_temp, path) = write_config("apiVersion: [unclosed");
        assert!(matches!(
            ReleaseConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_from_repo() {
        let temp = TempDir::new().unwrap();
        assert_eq!(ReleaseConfig::load_from_repo(temp.path()).unwrap(), None);

        fs::write(temp.path().join(RELEASE_CONFIG_FILE_NAME), FULL_CONFIG).unwrap();
        assert!(ReleaseConfig::load_from_repo(temp.path()).unwrap().is_some());
    }
}
