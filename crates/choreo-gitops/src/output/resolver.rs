//! Output directory resolution.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::{ConfigTier, ReleaseConfig};
use crate::domain::DomainIndex;

/// The two artifact kinds the writer persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Release,
    Binding,
}

impl ArtifactKind {
    /// Conventional directory name next to a component.
    pub fn subdirectory(&self) -> &'static str {
        match self {
            ArtifactKind::Release => "releases",
            ArtifactKind::Binding => "bindings",
        }
    }
}

/// Which rule of the resolution chain produced a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputDirSource {
    ComponentOverride,
    ProjectDefault,
    GlobalDefault,
    Explicit,
    Resolver,
    Convention,
}

impl From<ConfigTier> for OutputDirSource {
    fn from(tier: ConfigTier) -> Self {
        match tier {
            ConfigTier::ComponentOverride => OutputDirSource::ComponentOverride,
            ConfigTier::ProjectDefault => OutputDirSource::ProjectDefault,
            ConfigTier::GlobalDefault => OutputDirSource::GlobalDefault,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDir {
    pub dir: PathBuf,
    pub source: OutputDirSource,
}

/// Fallback directory lookup consulted after configuration.
pub trait OutputDirResolver {
    fn resolve(&self, kind: ArtifactKind, project: &str, component: &str) -> Option<PathBuf>;
}

impl<F> OutputDirResolver for F
where
    F: Fn(ArtifactKind, &str, &str) -> Option<PathBuf>,
{
    fn resolve(&self, kind: ArtifactKind, project: &str, component: &str) -> Option<PathBuf> {
        self(kind, project, component)
    }
}

/// Places artifacts near what the index already knows about a component.
///
/// Uses the directory of an existing artifact of the same kind, else a
/// `releases`/`bindings` directory next to the component's own file. That
/// directory becomes `releases-<component>` when it already exists with
/// other content in it.
pub struct IndexOutputResolver<'a> {
    index: &'a DomainIndex,
}

impl<'a> IndexOutputResolver<'a> {
    pub fn new(index: &'a DomainIndex) -> Self {
        Self { index }
    }
}

impl OutputDirResolver for IndexOutputResolver<'_> {
    fn resolve(&self, kind: ArtifactKind, project: &str, component: &str) -> Option<PathBuf> {
        let sibling = match kind {
            ArtifactKind::Release => self.index.latest_release(project, component).ok(),
            ArtifactKind::Binding => self
                .index
                .release_bindings_for_component(project, component)
                .into_iter()
                .next(),
        };
        if let Some(dir) = sibling.as_deref().and_then(|entry| entry.file_path.parent()) {
            return Some(dir.to_path_buf());
        }

        let component_entry = self
            .index
            .components_for_project(project)
            .into_iter()
            .find(|entry| entry.name() == component)?;
        let component_dir = component_entry.file_path.parent()?;
        Some(disambiguate(
            component_dir.join(kind.subdirectory()),
            kind,
            component,
        ))
    }
}

fn disambiguate(dir: PathBuf, kind: ArtifactKind, component: &str) -> PathBuf {
    let occupied = fs::read_dir(&dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false);
    if occupied {
        dir.with_file_name(format!("{}-{}", kind.subdirectory(), component))
    } else {
        dir
    }
}

/// Walks the resolution chain: sidecar config (component, project, global),
/// then an explicit directory, then the injected resolver, then the
/// repository convention `projects/<p>/components/<c>/<kind>`.
pub struct OutputPathResolver<'a> {
    base_dir: PathBuf,
    config: Option<&'a ReleaseConfig>,
    resolver: Option<Box<dyn OutputDirResolver + 'a>>,
}

impl<'a> OutputPathResolver<'a> {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            config: None,
            resolver: None,
        }
    }

    pub fn with_config(mut self, config: &'a ReleaseConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn with_resolver(mut self, resolver: impl OutputDirResolver + 'a) -> Self {
        self.resolver = Some(Box::new(resolver));
        self
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn resolve(
        &self,
        kind: ArtifactKind,
        project: &str,
        component: &str,
        explicit: Option<&Path>,
    ) -> ResolvedDir {
        let configured = self.config.and_then(|config| match kind {
            ArtifactKind::Release => config.release_output_dir(project, component),
            ArtifactKind::Binding => config.binding_output_dir(project, component),
        });
        if let Some((tier, dir)) = configured {
            return self.resolved(Path::new(dir), tier.into());
        }

        if let Some(dir) = explicit.filter(|dir| !dir.as_os_str().is_empty()) {
            return self.resolved(dir, OutputDirSource::Explicit);
        }

        if let Some(dir) = self
            .resolver
            .as_ref()
            .and_then(|resolver| resolver.resolve(kind, project, component))
            .filter(|dir| !dir.as_os_str().is_empty())
        {
            return self.resolved(&dir, OutputDirSource::Resolver);
        }

        ResolvedDir {
            dir: self
                .base_dir
                .join("projects")
                .join(project)
                .join("components")
                .join(component)
                .join(kind.subdirectory()),
            source: OutputDirSource::Convention,
        }
    }

    fn resolved(&self, dir: &Path, source: OutputDirSource) -> ResolvedDir {
        let dir = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.base_dir.join(dir)
        };
        ResolvedDir { dir, source }
    }
}
