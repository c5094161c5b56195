//! Resource documents as stored in the index.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

/// The `(group, version, kind)` triple identifying a document's schema family.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupVersionKind {
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl GroupVersionKind {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// Splits an `apiVersion` such as `openchoreo.dev/v1alpha1` (or the
    /// core-group form `v1`) into group and version.
    pub fn from_api_version(api_version: &str, kind: &str) -> Self {
        match api_version.split_once('/') {
            Some((group, version)) => Self::new(group, version, kind),
            None => Self::new("", api_version, kind),
        }
    }

    /// Reassembles the `apiVersion` string.
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }
}

impl fmt::Display for GroupVersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

/// Namespace/name pair. Cluster-scoped documents use an empty namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

/// A parsed document together with the file it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceEntry {
    /// The full document tree, including fields the core never reads.
    pub resource: Value,

    /// The file the document was parsed from.
    pub file_path: PathBuf,
}

impl ResourceEntry {
    pub fn new(resource: Value, file_path: impl Into<PathBuf>) -> Self {
        Self {
            resource,
            file_path: file_path.into(),
        }
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn api_version(&self) -> Option<&str> {
        self.nested_str(&["apiVersion"])
    }

    pub fn kind(&self) -> Option<&str> {
        self.nested_str(&["kind"])
    }

    /// Type identity, if both `apiVersion` and `kind` are present and non-empty.
    pub fn gvk(&self) -> Option<GroupVersionKind> {
        let api_version = self.api_version().filter(|v| !v.is_empty())?;
        let kind = self.kind().filter(|k| !k.is_empty())?;
        Some(GroupVersionKind::from_api_version(api_version, kind))
    }

    /// `metadata.name`, or the empty string.
    pub fn name(&self) -> &str {
        self.nested_str(&["metadata", "name"]).unwrap_or_default()
    }

    /// `metadata.namespace`, or the empty string for cluster-scoped documents.
    pub fn namespace(&self) -> &str {
        self.nested_str(&["metadata", "namespace"])
            .unwrap_or_default()
    }

    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.namespace(), self.name())
    }

    /// `namespace/name`, or just `name` when cluster-scoped.
    pub fn namespaced_name(&self) -> String {
        self.key().to_string()
    }

    /// Walks nested mappings along `path`.
    pub fn nested(&self, path: &[&str]) -> Option<&Value> {
        nested_value(&self.resource, path)
    }

    pub fn nested_str(&self, path: &[&str]) -> Option<&str> {
        self.nested(path).and_then(Value::as_str)
    }

    pub fn nested_map(&self, path: &[&str]) -> Option<&Map<String, Value>> {
        self.nested(path).and_then(Value::as_object)
    }

    pub fn nested_slice(&self, path: &[&str]) -> Option<&[Value]> {
        self.nested(path)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
    }

    /// The `spec` subtree, if any.
    pub fn spec(&self) -> Option<&Value> {
        self.nested(&["spec"])
    }
}

pub(crate) fn nested_value<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter()
        .try_fold(value, |current, segment| current.as_object()?.get(*segment))
}
