//! File and directory selection for repository scans.

use std::path::{Component, Path};

/// Directory names never scanned.
pub const DEFAULT_EXCLUDE_PATHS: &[&str] = &[
    ".git",
    ".ocg",
    "node_modules",
    "vendor",
    ".terraform",
    "target",
    "build",
    "dist",
];

/// File extensions considered resource documents.
pub const DEFAULT_INCLUDE_EXTENSIONS: &[&str] = &[".yaml", ".yml", ".json"];

/// Pure predicates deciding which files and directories a scan visits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFilter {
    /// Path segments that exclude everything beneath them. Matched exactly.
    pub exclude_paths: Vec<String>,
    /// Allowed extensions including the leading dot. Matched case-insensitively.
    pub include_extensions: Vec<String>,
}

impl Default for FileFilter {
    fn default() -> Self {
        Self {
            exclude_paths: DEFAULT_EXCLUDE_PATHS.iter().map(|s| s.to_string()).collect(),
            include_extensions: DEFAULT_INCLUDE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl FileFilter {
    /// Replaces the extension allow-list.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a directory name to the exclusion list.
    pub fn exclude(mut self, name: impl Into<String>) -> Self {
        self.exclude_paths.push(name.into());
        self
    }

    /// True if the file has an allowed extension and no segment of `path`
    /// is excluded.
    pub fn should_scan(&self, path: &Path) -> bool {
        if !self.has_allowed_extension(path) {
            return false;
        }

        !path.components().any(|component| match component {
            Component::Normal(segment) => segment
                .to_str()
                .is_some_and(|segment| self.is_excluded(segment)),
            _ => false,
        })
    }

    /// False for hidden directories and excluded names.
    pub fn should_descend_into_dir(&self, name: &str) -> bool {
        !name.starts_with('.') && !self.is_excluded(name)
    }

    fn is_excluded(&self, segment: &str) -> bool {
        self.exclude_paths.iter().any(|excluded| excluded == segment)
    }

    fn has_allowed_extension(&self, path: &Path) -> bool {
        let Some(extension) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let extension = format!(".{}", extension.to_lowercase());
        self.include_extensions
            .iter()
            .any(|allowed| allowed.to_lowercase() == extension)
    }
}

/// True for `.yaml`/`.yml` files, ignoring case.
pub fn is_yaml_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"))
}

/// True for `.json` files, ignoring case.
pub fn is_json_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}
