//! Comparing a candidate release against what is already on disk.

use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::error::OutputError;
use crate::naming::{compare_release_names, ReleaseName};

/// A release file found in an output directory.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRelease {
    pub name: String,
    pub path: PathBuf,
    pub document: Value,
}

/// Release names of `component` stored in `dir`, taken from file stems.
///
/// A missing directory has no releases.
pub fn release_files(dir: &Path, component: &str) -> Result<Vec<(String, PathBuf)>, OutputError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(OutputError::ReadDirectory {
                path: dir.to_path_buf(),
                source: e,
            })
        }
    };

    let mut releases = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| OutputError::ReadDirectory {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        if !is_yaml || !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        match ReleaseName::parse(stem) {
            Ok(parsed) if parsed.component == component => {
                releases.push((stem.to_string(), path));
            }
            _ => {}
        }
    }
    Ok(releases)
}

/// The newest release of `component` in `dir`, or `None` when there is none.
pub fn find_latest_release(dir: &Path, component: &str) -> Result<Option<StoredRelease>, OutputError> {
    let latest = release_files(dir, component)?
        .into_iter()
        .max_by(|(a, _), (b, _)| compare_release_names(a, b));
    let Some((name, path)) = latest else {
        return Ok(None);
    };

    let content = fs::read_to_string(&path).map_err(|e| OutputError::ReadFile {
        path: path.clone(),
        source: e,
    })?;
    let document: Value = serde_yaml::from_str(&content).map_err(|e| OutputError::ParseFile {
        path: path.clone(),
        message: e.to_string(),
    })?;

    Ok(Some(StoredRelease {
        name,
        path,
        document,
    }))
}

/// Whether two release documents carry the same `spec`.
///
/// Both sides pass through a YAML round trip first so that generated values
/// and values read back from disk agree on number representation.
pub fn release_specs_equal(candidate: &Value, stored: &Value) -> Result<bool, OutputError> {
    let left = normalize(candidate.get("spec").unwrap_or(&Value::Null))?;
    let right = normalize(stored.get("spec").unwrap_or(&Value::Null))?;
    Ok(left == right)
}

fn normalize(value: &Value) -> Result<Value, OutputError> {
    let yaml = serde_yaml::to_string(value).map_err(|e| OutputError::Serialize(e.to_string()))?;
    serde_yaml::from_str(&yaml).map_err(|e| OutputError::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_release(dir: &Path, name: &str, spec: Value) {
        let doc = json!({
            "apiVersion": "openchoreo.dev/v1alpha1",
            "kind": "ComponentRelease",
            "metadata": { "name": name },
            "spec": spec
        });
        fs::write(
            dir.join(format!("{}.yaml", name)),
            serde_yaml::to_string(&doc).unwrap(),
        )
        .unwrap();
    }

    #[test]
    fn test_missing_directory_has_no_releases() {
        let temp = TempDir::new().unwrap();
        let latest = find_latest_release(&temp.path().join("nope"), "greeter").unwrap();
        assert!(latest.is_none());
    }

    #[test]
    fn test_latest_release_uses_numeric_version() {
        let temp = TempDir::new().unwrap();
        write_release(temp.path(), "greeter-20250101-9", json!({ "v": 9 }));
        write_release(temp.path(), "greeter-20250101-10", json!({ "v": 10 }));
        write_release(temp.path(), "greeter-api-20250202-0", json!({ "v": 0 }));
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let latest = find_latest_release(temp.path(), "greeter").unwrap().unwrap();
        assert_eq!(latest.name, "greeter-20250101-10");
        assert_eq!(latest.document["spec"]["v"], json!(10));
    }

    #[test]
    fn test_specs_equal_against_disk_form() {
        let generated = json!({ "spec": { "ports": [8080], "env": { "A": "1" } } });
        let stored: Value =
            serde_yaml::from_str("spec:\n  env:\n    A: '1'\n  ports:\n  - 8080\n").unwrap();
        assert!(release_specs_equal(&generated, &stored).unwrap());
    }

    #[test]
    fn test_specs_differ() {
        let a = json!({ "spec": { "image": "a:1" } });
        let b = json!({ "spec": { "image": "a:2" } });
        assert!(!release_specs_equal(&a, &b).unwrap());
    }
}
