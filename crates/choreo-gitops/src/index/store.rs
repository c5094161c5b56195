//! Concurrency-safe in-memory store of resource documents.

use log::{debug, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

use super::entry::{GroupVersionKind, ObjectKey, ResourceEntry};

/// Errors raised when inserting into the index.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Resource in '{path}' has no type identity (apiVersion/kind)")]
    MissingIdentity { path: PathBuf },

    #[error("Resource of kind '{kind}' in '{path}' has no name")]
    MissingName { kind: String, path: PathBuf },
}

/// What `Index::add` did with a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// First document with this identity.
    Inserted,
    /// An earlier document with the same identity was overwritten.
    Replaced { previous_file: PathBuf },
}

/// An identity defined by more than one file.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DuplicateIdentity {
    pub gvk: GroupVersionKind,
    pub key: ObjectKey,
    /// Every file defining the identity, sorted.
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub total_resources: usize,
    pub total_files: usize,
    pub kind_counts: BTreeMap<GroupVersionKind, usize>,
}

#[derive(Debug, Default)]
struct IndexInner {
    by_identity: HashMap<GroupVersionKind, HashMap<ObjectKey, Arc<ResourceEntry>>>,
    by_file: HashMap<PathBuf, Vec<Arc<ResourceEntry>>>,
}

/// Documents keyed by `(type identity, namespace, name)` and by source file.
///
/// A later document with an existing identity replaces the earlier one
/// wholesale. Replacements across files are logged and remain visible
/// through [`Index::duplicates`].
#[derive(Debug)]
pub struct Index {
    repo_path: PathBuf,
    inner: RwLock<IndexInner>,
}

impl Index {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
            inner: RwLock::new(IndexInner::default()),
        }
    }

    /// The repository root this index was built from.
    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Inserts a document, overwriting any document with the same identity.
    pub fn add(&self, entry: ResourceEntry) -> Result<AddOutcome, IndexError> {
        let gvk = entry.gvk().ok_or_else(|| IndexError::MissingIdentity {
            path: entry.file_path.clone(),
        })?;
        if entry.name().is_empty() {
            return Err(IndexError::MissingName {
                kind: gvk.kind,
                path: entry.file_path,
            });
        }

        let key = entry.key();
        let entry = Arc::new(entry);
        let mut inner = self.write();

        inner
            .by_file
            .entry(entry.file_path.clone())
            .or_default()
            .push(Arc::clone(&entry));

        let previous = inner
            .by_identity
            .entry(gvk.clone())
            .or_default()
            .insert(key.clone(), Arc::clone(&entry));

        Ok(match previous {
            None => AddOutcome::Inserted,
            Some(previous) => {
                if previous.file_path != entry.file_path {
                    warn!(
                        "{} '{}' in {} overrides the definition in {}",
                        gvk.kind,
                        key,
                        entry.file_path.display(),
                        previous.file_path.display()
                    );
                }
                AddOutcome::Replaced {
                    previous_file: previous.file_path.clone(),
                }
            }
        })
    }

    pub fn get(
        &self,
        gvk: &GroupVersionKind,
        namespace: &str,
        name: &str,
    ) -> Option<Arc<ResourceEntry>> {
        let key = ObjectKey::new(namespace, name);
        self.read()
            .by_identity
            .get(gvk)
            .and_then(|entries| entries.get(&key))
            .cloned()
    }

    /// Every document of one type. No ordering guarantee.
    pub fn list(&self, gvk: &GroupVersionKind) -> Vec<Arc<ResourceEntry>> {
        self.read()
            .by_identity
            .get(gvk)
            .map(|entries| entries.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Every document currently visible through its identity.
    pub fn list_all(&self) -> Vec<Arc<ResourceEntry>> {
        self.read()
            .by_identity
            .values()
            .flat_map(|entries| entries.values().cloned())
            .collect()
    }

    /// Documents parsed from one file, in document order.
    pub fn get_by_file(&self, path: &Path) -> Vec<Arc<ResourceEntry>> {
        self.read().by_file.get(path).cloned().unwrap_or_default()
    }

    /// Source files known to the index, sorted.
    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = self.read().by_file.keys().cloned().collect();
        files.sort();
        files
    }

    /// Purges every document sourced from `path` and returns how many were removed.
    ///
    /// An identity still defined by another file falls back to that
    /// definition (greatest file path wins).
    pub fn remove_entries_for_file(&self, path: &Path) -> usize {
        let mut guard = self.write();
        let inner = &mut *guard;

        let Some(removed) = inner.by_file.remove(path) else {
            return 0;
        };

        for entry in &removed {
            let Some(gvk) = entry.gvk() else {
                continue;
            };
            let key = entry.key();

            let owned_by_file = inner
                .by_identity
                .get(&gvk)
                .and_then(|entries| entries.get(&key))
                .is_some_and(|current| current.file_path == path);
            if !owned_by_file {
                continue;
            }

            let replacement = inner
                .by_file
                .values()
                .flat_map(|entries| entries.iter())
                .filter(|candidate| candidate.gvk().as_ref() == Some(&gvk) && candidate.key() == key)
                .max_by(|a, b| a.file_path.cmp(&b.file_path))
                .cloned();

            if let Some(entries) = inner.by_identity.get_mut(&gvk) {
                match replacement {
                    Some(replacement) => {
                        debug!(
                            "{} '{}' now resolves to {}",
                            gvk.kind,
                            key,
                            replacement.file_path.display()
                        );
                        entries.insert(key, replacement);
                    }
                    None => {
                        entries.remove(&key);
                    }
                }
                if entries.is_empty() {
                    inner.by_identity.remove(&gvk);
                }
            }
        }

        removed.len()
    }

    /// Identities defined in more than one file.
    pub fn duplicates(&self) -> Vec<DuplicateIdentity> {
        let inner = self.read();
        let mut sources: HashMap<(GroupVersionKind, ObjectKey), BTreeSet<PathBuf>> =
            HashMap::new();

        for (file, entries) in &inner.by_file {
            for entry in entries {
                if let Some(gvk) = entry.gvk() {
                    sources
                        .entry((gvk, entry.key()))
                        .or_default()
                        .insert(file.clone());
                }
            }
        }

        let mut duplicates: Vec<DuplicateIdentity> = sources
            .into_iter()
            .filter(|(_, files)| files.len() > 1)
            .map(|((gvk, key), files)| DuplicateIdentity {
                gvk,
                key,
                files: files.into_iter().collect(),
            })
            .collect();
        duplicates.sort();
        duplicates
    }

    pub fn stats(&self) -> IndexStats {
        let inner = self.read();
        let kind_counts: BTreeMap<GroupVersionKind, usize> = inner
            .by_identity
            .iter()
            .map(|(gvk, entries)| (gvk.clone(), entries.len()))
            .collect();

        IndexStats {
            total_resources: kind_counts.values().sum(),
            total_files: inner.by_file.len(),
            kind_counts,
        }
    }

    pub fn len(&self) -> usize {
        self.read().by_identity.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexInner> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Index lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexInner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!("Index lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
