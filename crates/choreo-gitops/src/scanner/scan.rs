//! Concurrent repository scanning.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{debug, error};
use tracing::{info, info_span, warn};
use walkdir::WalkDir;

use super::error::ScanError;
use super::filter::FileFilter;
use super::parser::{parse_file, validate_resource};
use crate::index::{Index, ResourceEntry};

/// Worker count used when none (or zero) is configured.
pub const DEFAULT_WORKERS: usize = 10;

/// Receives every per-file or per-document failure during a scan.
pub type ErrorHandler = Arc<dyn Fn(&Path, &ScanError) + Send + Sync>;

#[derive(Clone)]
pub struct ScanOptions {
    pub workers: usize,
    pub filter: FileFilter,
    /// Defaults to logging a warning.
    pub error_handler: Option<ErrorHandler>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            filter: FileFilter::default(),
            error_handler: None,
        }
    }
}

impl fmt::Debug for ScanOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScanOptions")
            .field("workers", &self.workers)
            .field("filter", &self.filter)
            .field("error_handler", &self.error_handler.is_some())
            .finish()
    }
}

impl ScanOptions {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_filter(mut self, filter: FileFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_error_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&Path, &ScanError) + Send + Sync + 'static,
    {
        self.error_handler = Some(Arc::new(handler));
        self
    }
}

/// Documents decoded from one file, in document order.
struct FileDocuments {
    path: PathBuf,
    entries: Vec<ResourceEntry>,
}

/// Walks a repository and indexes every resource document in it.
///
/// One thread walks the tree, a fixed pool of workers parses and validates
/// files, and the calling thread collects the results into an [`Index`].
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    options: ScanOptions,
}

impl Scanner {
    pub fn new(mut options: ScanOptions) -> Self {
        if options.workers == 0 {
            options.workers = DEFAULT_WORKERS;
        }
        Self { options }
    }

    pub fn workers(&self) -> usize {
        self.options.workers
    }

    pub fn filter(&self) -> &FileFilter {
        &self.options.filter
    }

    /// Scans `root` and returns the populated index.
    ///
    /// Blocks until the walk, all workers and the collector are done. Files
    /// are inserted in path order, so when two files define the same
    /// identity the one with the greater path wins.
    pub fn scan(&self, root: &Path) -> Result<Index, ScanError> {
        check_root(root)?;

        let worker_count = self.workers();
        let _span = info_span!("scan_repository", root = %root.display(), workers = worker_count)
            .entered();

        let report = self.reporter();
        let (path_sender, path_receiver) = bounded::<PathBuf>(worker_count * 2);
        let (docs_sender, docs_receiver) = bounded::<FileDocuments>(worker_count * 2);

        let walker = {
            let root = root.to_path_buf();
            let filter = self.options.filter.clone();
            let report = Arc::clone(&report);
            thread::spawn(move || walk_repository(&root, &filter, &path_sender, &report))
        };

        let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let paths = path_receiver.clone();
            let results = docs_sender.clone();
            let report = Arc::clone(&report);
            workers.push(thread::spawn(move || {
                run_worker(worker_id, paths, results, report)
            }));
        }
        drop(path_receiver);
        drop(docs_sender);

        let mut files: Vec<FileDocuments> = docs_receiver.iter().collect();

        match walker.join() {
            Ok(discovered) => debug!("Discovered {} candidate files", discovered),
            Err(e) => error!("Directory walker panicked: {:?}", e),
        }
        for (i, worker) in workers.into_iter().enumerate() {
            if let Err(e) = worker.join() {
                error!("Scan worker {} panicked: {:?}", i, e);
            }
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));

        let index = Index::new(root);
        for file in files {
            for entry in file.entries {
                if let Err(e) = index.add(entry) {
                    report(&file.path, &ScanError::from(e));
                }
            }
        }

        let stats = index.stats();
        info!(
            resources = stats.total_resources,
            files = stats.total_files,
            "Repository scan complete"
        );
        Ok(index)
    }

    /// Re-reads one file into an existing index.
    ///
    /// Everything previously sourced from `path` is removed first; a deleted
    /// or filtered-out file simply leaves nothing behind. Returns the number
    /// of documents added.
    pub fn rescan_file(&self, index: &Index, path: &Path) -> Result<usize, ScanError> {
        let removed = index.remove_entries_for_file(path);
        debug!("Removed {} entries from {}", removed, path.display());

        let relative = path.strip_prefix(index.repo_path()).unwrap_or(path);
        if !path.is_file() || !self.is_reachable(relative) {
            return Ok(0);
        }

        let report = self.reporter();
        let mut added = 0;
        for entry in parse_file(path)? {
            if let Err(e) = validate_resource(&entry) {
                report(path, &e);
                continue;
            }
            match index.add(entry) {
                Ok(_) => added += 1,
                Err(e) => report(path, &ScanError::from(e)),
            }
        }
        Ok(added)
    }

    /// Whether a walk from the root would reach and accept `relative`.
    fn is_reachable(&self, relative: &Path) -> bool {
        let filter = &self.options.filter;
        let mut segments: Vec<Component<'_>> = relative.components().collect();
        segments.pop();

        let parents_ok = segments.iter().all(|component| match component {
            Component::Normal(name) => name
                .to_str()
                .is_some_and(|name| filter.should_descend_into_dir(name)),
            _ => true,
        });
        parents_ok && filter.should_scan(relative)
    }

    fn reporter(&self) -> ErrorHandler {
        match &self.options.error_handler {
            Some(handler) => Arc::clone(handler),
            None => {
                let handler: ErrorHandler = Arc::new(log_scan_error);
                handler
            }
        }
    }
}

/// Scans `root` with default options.
pub fn scan_repository(root: &Path) -> Result<Index, ScanError> {
    Scanner::default().scan(root)
}

/// Scans `root` with the given options.
pub fn scan_repository_with_options(root: &Path, options: ScanOptions) -> Result<Index, ScanError> {
    Scanner::new(options).scan(root)
}

fn check_root(root: &Path) -> Result<(), ScanError> {
    match fs::metadata(root) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(ScanError::NotADirectory {
            path: root.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ScanError::RootNotFound {
            path: root.to_path_buf(),
        }),
        Err(e) => Err(ScanError::ReadFile {
            path: root.to_path_buf(),
            source: e,
        }),
    }
}

fn log_scan_error(path: &Path, err: &ScanError) {
    warn!(path = %path.display(), error = %err, "Skipping resource file");
}

fn walk_repository(
    root: &Path,
    filter: &FileFilter,
    paths: &Sender<PathBuf>,
    report: &ErrorHandler,
) -> usize {
    let mut discovered = 0;

    let walker = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| filter.should_descend_into_dir(name))
        });

    for entry in walker {
        match entry {
            Ok(entry) => {
                if !entry.file_type().is_file() {
                    continue;
                }
                let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
                if !filter.should_scan(relative) {
                    continue;
                }
                discovered += 1;
                if paths.send(entry.into_path()).is_err() {
                    break;
                }
            }
            Err(e) => {
                let path = e.path().unwrap_or(root).to_path_buf();
                report(
                    &path,
                    &ScanError::Walk {
                        path: path.clone(),
                        message: e.to_string(),
                    },
                );
            }
        }
    }

    discovered
}

fn run_worker(
    worker_id: usize,
    paths: Receiver<PathBuf>,
    results: Sender<FileDocuments>,
    report: ErrorHandler,
) {
    debug!("Scan worker {} started", worker_id);

    while let Ok(path) = paths.recv() {
        let entries = match parse_file(&path) {
            Ok(entries) => entries,
            Err(e) => {
                report(&path, &e);
                continue;
            }
        };

        let mut valid = Vec::with_capacity(entries.len());
        for entry in entries {
            match validate_resource(&entry) {
                Ok(()) => valid.push(entry),
                Err(e) => report(&path, &e),
            }
        }
        if valid.is_empty() {
            continue;
        }

        if results
            .send(FileDocuments {
                path,
                entries: valid,
            })
            .is_err()
        {
            break;
        }
    }

    debug!("Scan worker {} finished", worker_id);
}
