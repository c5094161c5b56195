//! Decoding of resource files into index entries.

use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;

use super::error::{ParseError, ScanError};
use super::filter::is_json_file;
use crate::index::ResourceEntry;

/// Decodes every document in `content`.
///
/// `.json` files are read as a stream of JSON values, everything else as a
/// YAML stream. Units that are empty, not a mapping, or lack `apiVersion`
/// or `kind` are skipped. A syntax error fails the whole file.
pub fn parse_documents(content: &[u8], path: &Path) -> Result<Vec<ResourceEntry>, ParseError> {
    Ok(decode_values(content, path)?
        .into_iter()
        .enumerate()
        .filter_map(|(position, value)| into_entry(value, path, position))
        .collect())
}

/// Decodes every unit of a file without resource filtering.
pub fn decode_values(content: &[u8], path: &Path) -> Result<Vec<Value>, ParseError> {
    if is_json_file(path) {
        decode_json_stream(content, path)
    } else {
        decode_yaml_stream(content, path)
    }
}

/// Reads and decodes a file from disk.
pub fn parse_file(path: &Path) -> Result<Vec<ResourceEntry>, ScanError> {
    let content = fs::read(path).map_err(|e| ScanError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(parse_documents(&content, path)?)
}

/// Second gate after parsing: a document must carry identity fields and a name.
pub fn validate_resource(entry: &ResourceEntry) -> Result<(), ScanError> {
    let invalid = |message: &str| ScanError::InvalidResource {
        path: entry.file_path.clone(),
        message: message.to_string(),
    };

    if entry.api_version().unwrap_or_default().is_empty() {
        return Err(invalid("resource has no apiVersion"));
    }
    if entry.kind().unwrap_or_default().is_empty() {
        return Err(invalid("resource has no kind"));
    }
    if entry.name().is_empty() {
        return Err(invalid(&format!(
            "{} resource has no name",
            entry.kind().unwrap_or_default()
        )));
    }
    Ok(())
}

fn decode_yaml_stream(content: &[u8], path: &Path) -> Result<Vec<Value>, ParseError> {
    let mut values = Vec::new();

    for document in serde_yaml::Deserializer::from_slice(content) {
        let value = serde_yaml::Value::deserialize(document).map_err(|e| ParseError::Yaml {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        match serde_json::to_value(&value) {
            Ok(value) => values.push(value),
            Err(e) => debug!(
                "Skipping document in {} with unsupported structure: {}",
                path.display(),
                e
            ),
        }
    }

    Ok(values)
}

fn decode_json_stream(content: &[u8], path: &Path) -> Result<Vec<Value>, ParseError> {
    serde_json::Deserializer::from_slice(content)
        .into_iter::<Value>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ParseError::Json {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
}

fn into_entry(value: Value, path: &Path, position: usize) -> Option<ResourceEntry> {
    let has_identity = |field: &str| {
        value
            .get(field)
            .and_then(Value::as_str)
            .is_some_and(|s| !s.is_empty())
    };

    if !value.is_object() || !has_identity("apiVersion") || !has_identity("kind") {
        debug!(
            "Skipping document {} in {}: not a resource",
            position,
            path.display()
        );
        return None;
    }

    Some(ResourceEntry::new(value, path))
}
