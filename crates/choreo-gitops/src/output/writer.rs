//! Persisting generated releases and bindings.

use serde_json::{json, Value};
use std::fs::{self, DirBuilder, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, info_span, warn};

use super::compare::{find_latest_release, release_specs_equal};
use super::error::OutputError;
use super::resolver::{ArtifactKind, OutputDirResolver, OutputPathResolver, ResolvedDir};
use crate::config::ReleaseConfig;
use crate::domain::ResourceKind;
use crate::generator::{BindingInfo, ReleaseInfo};
use crate::index::entry::nested_value;
use crate::naming::ReleaseName;
use crate::scanner::decode_values;

/// Upper bound on version bumps when release files collide.
const MAX_VERSION_ATTEMPTS: u32 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Directory used when the sidecar config names none.
    pub output_dir: Option<PathBuf>,
    /// Skip a release whose spec matches the newest one on disk.
    pub skip_if_unchanged: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            output_dir: None,
            skip_if_unchanged: true,
        }
    }
}

impl WriteOptions {
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_skip_if_unchanged(mut self, skip: bool) -> Self {
        self.skip_if_unchanged = skip;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written { path: PathBuf, name: String },
    /// The newest stored release already has this spec.
    Unchanged { path: PathBuf, name: String },
}

impl WriteOutcome {
    pub fn path(&self) -> &Path {
        match self {
            WriteOutcome::Written { path, .. } | WriteOutcome::Unchanged { path, .. } => path,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            WriteOutcome::Written { name, .. } | WriteOutcome::Unchanged { name, .. } => name,
        }
    }

    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written { .. })
    }
}

#[derive(Debug)]
pub struct WriteFailure {
    pub name: String,
    pub error: OutputError,
}

#[derive(Debug, Default)]
pub struct BulkWriteResult {
    pub written: Vec<PathBuf>,
    pub unchanged: Vec<PathBuf>,
    pub errors: Vec<WriteFailure>,
}

/// Writes artifacts into the repository tree.
pub struct OutputWriter<'a> {
    paths: OutputPathResolver<'a>,
}

impl<'a> OutputWriter<'a> {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            paths: OutputPathResolver::new(base_dir),
        }
    }

    pub fn with_config(mut self, config: &'a ReleaseConfig) -> Self {
        self.paths = self.paths.with_config(config);
        self
    }

    pub fn with_resolver(mut self, resolver: impl OutputDirResolver + 'a) -> Self {
        self.paths = self.paths.with_resolver(resolver);
        self
    }

    pub fn output_dir(
        &self,
        kind: ArtifactKind,
        project: &str,
        component: &str,
        opts: &WriteOptions,
    ) -> ResolvedDir {
        self.paths
            .resolve(kind, project, component, opts.output_dir.as_deref())
    }

    /// Writes a release as `<release-name>.yaml`.
    ///
    /// When the intended file already exists the version suffix is bumped
    /// until a free name is found, and `metadata.name` follows the file name.
    pub fn write_release(
        &self,
        info: &ReleaseInfo,
        opts: &WriteOptions,
    ) -> Result<WriteOutcome, OutputError> {
        let _span = info_span!("write_release", release = %info.release_name).entered();
        let resolved = self.output_dir(
            ArtifactKind::Release,
            &info.project_name,
            &info.component_name,
            opts,
        );
        debug!(dir = %resolved.dir.display(), source = ?resolved.source, "Resolved release directory");

        if opts.skip_if_unchanged {
            if let Some(unchanged) = unchanged_release(&resolved.dir, info) {
                info!(path = %unchanged.path().display(), "Release unchanged, skipping write");
                return Ok(unchanged);
            }
        }

        ensure_directory(&resolved.dir)?;

        let mut document = info.release.clone();
        let mut name = info.release_name.clone();
        for _ in 0..MAX_VERSION_ATTEMPTS {
            set_metadata_name(&mut document, &name);
            let path = resolved.dir.join(format!("{}.yaml", name));
            let content = to_yaml(&document)?;

            match create_exclusive(&path, content.as_bytes()) {
                Ok(()) => {
                    info!(path = %path.display(), "Wrote release");
                    return Ok(WriteOutcome::Written { path, name });
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    let Ok(parsed) = ReleaseName::parse(&name) else {
                        return Err(OutputError::WriteFile { path, source: e });
                    };
                    let Ok(next) = parsed.next() else {
                        break;
                    };
                    debug!(taken = %name, next = %next, "Release file exists, bumping version");
                    name = next.to_string();
                }
                Err(e) => return Err(OutputError::WriteFile { path, source: e }),
            }
        }

        Err(OutputError::NoFreeVersion {
            name: info.release_name.clone(),
            dir: resolved.dir,
        })
    }

    pub fn write_releases(&self, releases: &[ReleaseInfo], opts: &WriteOptions) -> BulkWriteResult {
        let mut result = BulkWriteResult::default();
        for info in releases {
            match self.write_release(info, opts) {
                Ok(WriteOutcome::Written { path, .. }) => result.written.push(path),
                Ok(WriteOutcome::Unchanged { path, .. }) => result.unchanged.push(path),
                Err(error) => {
                    warn!(release = %info.release_name, error = %error, "Failed to write release");
                    result.errors.push(WriteFailure {
                        name: info.release_name.clone(),
                        error,
                    });
                }
            }
        }
        result
    }

    /// Writes a binding.
    ///
    /// Updates go back to the file they came from, replacing only the
    /// matching document. New bindings land in the resolved directory as
    /// `<binding-name>.yaml`, overwriting any file of that name.
    pub fn write_binding(
        &self,
        info: &BindingInfo,
        opts: &WriteOptions,
    ) -> Result<PathBuf, OutputError> {
        let _span = info_span!("write_binding", binding = %info.binding_name).entered();

        if let Some(path) = info.existing_file_path.as_deref().filter(|_| info.is_update) {
            rewrite_binding_in_file(path, info)?;
            info!(path = %path.display(), "Updated binding");
            return Ok(path.to_path_buf());
        }

        let resolved = self.output_dir(
            ArtifactKind::Binding,
            &info.project_name,
            &info.component_name,
            opts,
        );
        ensure_directory(&resolved.dir)?;
        let path = resolved.dir.join(format!("{}.yaml", info.binding_name));
        write_file(&path, to_yaml(&info.binding)?.as_bytes())?;
        info!(path = %path.display(), "Wrote binding");
        Ok(path)
    }

    pub fn write_bindings(&self, bindings: &[BindingInfo], opts: &WriteOptions) -> BulkWriteResult {
        let mut result = BulkWriteResult::default();
        for info in bindings {
            match self.write_binding(info, opts) {
                Ok(path) => result.written.push(path),
                Err(error) => {
                    warn!(binding = %info.binding_name, error = %error, "Failed to write binding");
                    result.errors.push(WriteFailure {
                        name: info.binding_name.clone(),
                        error,
                    });
                }
            }
        }
        result
    }
}

/// Renders documents as a YAML stream, each preceded by `---`.
pub fn render_documents(documents: &[Value]) -> Result<String, OutputError> {
    let mut out = String::new();
    for document in documents {
        out.push_str("---\n");
        out.push_str(&to_yaml(document)?);
    }
    Ok(out)
}

fn unchanged_release(dir: &Path, info: &ReleaseInfo) -> Option<WriteOutcome> {
    let stored = match find_latest_release(dir, &info.component_name) {
        Ok(stored) => stored?,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Could not check for an identical release");
            return None;
        }
    };
    match release_specs_equal(&info.release, &stored.document) {
        Ok(true) => Some(WriteOutcome::Unchanged {
            path: stored.path,
            name: stored.name,
        }),
        Ok(false) => None,
        Err(e) => {
            warn!(path = %stored.path.display(), error = %e, "Could not compare releases");
            None
        }
    }
}

fn rewrite_binding_in_file(path: &Path, info: &BindingInfo) -> Result<(), OutputError> {
    let content = fs::read(path).map_err(|e| OutputError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut documents = decode_values(&content, path).map_err(|e| OutputError::ParseFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let namespace = nested_str(&info.binding, &["metadata", "namespace"]);
    let target = documents
        .iter_mut()
        .find(|doc| {
            nested_str(doc, &["kind"]) == ResourceKind::ReleaseBinding.as_str()
                && nested_str(doc, &["metadata", "name"]) == info.binding_name
                && nested_str(doc, &["metadata", "namespace"]) == namespace
        })
        .ok_or_else(|| OutputError::BindingNotInFile {
            name: info.binding_name.clone(),
            path: path.to_path_buf(),
        })?;
    *target = info.binding.clone();

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let rendered = if is_json {
        to_json_stream(&documents)?
    } else if documents.len() == 1 {
        to_yaml(&documents[0])?
    } else {
        render_documents(&documents)?
    };
    write_file(path, rendered.as_bytes())
}

fn nested_str<'a>(value: &'a Value, path: &[&str]) -> &'a str {
    nested_value(value, path)
        .and_then(Value::as_str)
        .unwrap_or_default()
}

fn set_metadata_name(document: &mut Value, name: &str) {
    let Some(object) = document.as_object_mut() else {
        return;
    };
    let metadata = object.entry("metadata").or_insert_with(|| json!({}));
    if let Some(metadata) = metadata.as_object_mut() {
        metadata.insert("name".to_string(), json!(name));
    }
}

fn to_yaml(document: &Value) -> Result<String, OutputError> {
    serde_yaml::to_string(document).map_err(|e| OutputError::Serialize(e.to_string()))
}

fn to_json_stream(documents: &[Value]) -> Result<String, OutputError> {
    let mut out = String::new();
    for document in documents {
        let rendered = serde_json::to_string_pretty(document)
            .map_err(|e| OutputError::Serialize(e.to_string()))?;
        out.push_str(&rendered);
        out.push('\n');
    }
    Ok(out)
}

fn ensure_directory(path: &Path) -> Result<(), OutputError> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder
        .create(path)
        .map_err(|e| OutputError::CreateDirectory {
            path: path.to_path_buf(),
            source: e,
        })
}

fn file_options() -> OpenOptions {
    let mut options = OpenOptions::new();
    options.write(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    options
}

/// Fails with `AlreadyExists` instead of replacing an existing file.
fn create_exclusive(path: &Path, content: &[u8]) -> io::Result<()> {
    create_exclusive_with(path, |file| file.write_all(content))
}

/// A failed fill removes the partial file so the name is not left taken.
fn create_exclusive_with<F>(path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let mut file = file_options().create_new(true).open(path)?;
    if let Err(e) = fill(&mut file).and_then(|()| file.sync_all()) {
        drop(file);
        if let Err(remove_err) = fs::remove_file(path) {
            warn!(path = %path.display(), error = %remove_err, "Failed to remove partial release file");
        }
        return Err(e);
    }
    Ok(())
}

fn write_file(path: &Path, content: &[u8]) -> Result<(), OutputError> {
    file_options()
        .create(true)
        .truncate(true)
        .open(path)
        .and_then(|mut file| file.write_all(content))
        .map_err(|e| OutputError::WriteFile {
            path: path.to_path_buf(),
            source: e,
        })
}
