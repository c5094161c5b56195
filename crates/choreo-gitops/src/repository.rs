//! A scanned repository with its indexes, sidecar config and writers.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, info_span};

use crate::config::{ReleaseConfig, RELEASE_CONFIG_FILE_NAME};
use crate::domain::DomainIndex;
use crate::error::Result;
use crate::generator::{
    BindingGenerator, BindingInfo, BindingOptions, ReleaseGenerator, ReleaseInfo, ReleaseOptions,
};
use crate::index::Index;
use crate::output::{IndexOutputResolver, OutputWriter, WriteOptions, WriteOutcome};
use crate::pipeline::PipelineInfo;
use crate::scanner::{ScanOptions, Scanner};

/// Entry point for working on a GitOps repository checked out on disk.
#[derive(Debug)]
pub struct GitOpsRepository {
    root: PathBuf,
    scanner: Scanner,
    domain: DomainIndex,
    config: Option<ReleaseConfig>,
}

impl GitOpsRepository {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(root, ScanOptions::default())
    }

    /// Loads the optional `release-config.yaml`, scans the tree and builds
    /// the domain index. The sidecar itself is never indexed.
    pub fn open_with_options(root: impl AsRef<Path>, mut options: ScanOptions) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        let _span = info_span!("open_repository", root = %root.display()).entered();

        let config = ReleaseConfig::load_from_repo(&root)?;
        options.filter = options.filter.exclude(RELEASE_CONFIG_FILE_NAME);
        let scanner = Scanner::new(options);
        let index = scanner.scan(&root)?;
        let domain = DomainIndex::new(Arc::new(index));

        info!(
            resources = domain.index().len(),
            has_config = config.is_some(),
            "Repository opened"
        );

        Ok(Self {
            root,
            scanner,
            domain,
            config,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index(&self) -> &Arc<Index> {
        self.domain.index()
    }

    pub fn domain(&self) -> &DomainIndex {
        &self.domain
    }

    pub fn config(&self) -> Option<&ReleaseConfig> {
        self.config.as_ref()
    }

    pub fn release_generator(&self) -> ReleaseGenerator<'_> {
        ReleaseGenerator::new(&self.domain)
    }

    pub fn binding_generator(&self) -> BindingGenerator<'_> {
        BindingGenerator::new(&self.domain)
    }

    /// A writer rooted at the repository, consulting the sidecar config and
    /// then the index for output directories.
    pub fn writer(&self) -> OutputWriter<'_> {
        let writer =
            OutputWriter::new(&self.root).with_resolver(IndexOutputResolver::new(&self.domain));
        match &self.config {
            Some(config) => writer.with_config(config),
            None => writer,
        }
    }

    pub fn pipeline_for_project(&self, namespace: &str, project: &str) -> Result<PipelineInfo> {
        Ok(self.domain.pipeline_for_project(namespace, project)?)
    }

    /// Re-reads one file after it changed on disk.
    pub fn refresh_file(&self, path: &Path) -> Result<usize> {
        Ok(self.domain.rescan_file(&self.scanner, path)?)
    }

    /// Generates a release, writes it and indexes the new file so the next
    /// release of the same component gets the following version.
    pub fn create_release(
        &self,
        opts: &ReleaseOptions,
        write: &WriteOptions,
    ) -> Result<(ReleaseInfo, WriteOutcome)> {
        let info = self.release_generator().generate_release(opts)?;
        let outcome = self.writer().write_release(&info, write)?;
        if outcome.is_written() {
            self.refresh_file(outcome.path())?;
        }
        Ok((info, outcome))
    }

    /// Generates a binding through the project's pipeline, writes it and
    /// re-indexes the file.
    pub fn create_binding(
        &self,
        opts: &BindingOptions,
        write: &WriteOptions,
    ) -> Result<(BindingInfo, PathBuf)> {
        let pipeline = self.pipeline_for_project(&opts.namespace, &opts.project)?;
        let info = self.binding_generator().generate_binding(opts, &pipeline)?;
        let path = self.writer().write_binding(&info, write)?;
        self.refresh_file(&path)?;
        Ok((info, path))
    }
}
