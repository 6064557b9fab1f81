//! File selection for directory traversal

use crate::config::Config;
use crate::error::SelectionError;
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// Outcome of one walk: files to chunk and files left out for size
#[derive(Debug, Clone, Default)]
pub struct Selection {
    pub files: Vec<PathBuf>,
    /// Allowed files larger than the configured maximum
    pub oversized: Vec<PathBuf>,
}

/// Selects candidate files under a repository root.
///
/// A path is selected when its extension is allowed and no directory between
/// the root and the file carries an ignored name. Results are absolute and
/// sorted, so two walks of the same tree agree.
pub struct FileWalker {
    pub(crate) root: PathBuf,
    pub(crate) extensions: HashSet<String>,
    pub(crate) ignored_dirs: HashSet<String>,
    pub(crate) max_file_size: u64,
    pub(crate) respect_gitignore: bool,
}

impl FileWalker {
    pub fn new<I, S>(root: impl AsRef<Path>, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            root: root.as_ref().to_path_buf(),
            extensions: extensions
                .into_iter()
                .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            ignored_dirs: HashSet::new(),
            max_file_size: u64::MAX,
            respect_gitignore: false,
        }
    }

    /// Build a walker from the `[repository]` section
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.repository.root, config.normalized_extensions())
            .with_ignored_dirs(config.repository.ignored_dirs.iter())
            .with_max_file_size(config.repository.max_file_size)
            .with_gitignore(config.repository.respect_gitignore)
    }

    pub fn with_ignored_dirs<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ignored_dirs = dirs.into_iter().map(|d| d.as_ref().to_string()).collect();
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn with_gitignore(mut self, respect: bool) -> Self {
        self.respect_gitignore = respect;
        self
    }

    /// Resolve the root to an absolute directory path
    pub fn resolve_root(&self) -> Result<PathBuf, SelectionError> {
        if !self.root.exists() {
            return Err(SelectionError::RootNotFound(self.root.display().to_string()));
        }
        if !self.root.is_dir() {
            return Err(SelectionError::NotADirectory(self.root.display().to_string()));
        }
        self.root
            .canonicalize()
            .map_err(|e| SelectionError::WalkFailed(format!("{}: {}", self.root.display(), e)))
    }

    /// Walk the directory and collect all eligible files
    pub fn walk(&self) -> Result<Vec<PathBuf>, SelectionError> {
        Ok(self.select()?.files)
    }

    /// Walk the directory, keeping track of files skipped for size
    pub fn select(&self) -> Result<Selection, SelectionError> {
        let root = self.resolve_root()?;

        let ignored = self.ignored_dirs.clone();
        let walker = WalkBuilder::new(&root)
            .standard_filters(false)
            .hidden(false)
            .ignore(self.respect_gitignore)
            .git_ignore(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .require_git(false)
            .follow_links(false)
            .filter_entry(move |entry| {
                // Prune ignored directories before descending into them
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                entry.depth() == 0
                    || !is_dir
                    || !entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| ignored.contains(name))
            })
            .build();

        let mut selection = Selection::default();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            if !self.has_allowed_extension(path) {
                continue;
            }

            if let Ok(metadata) = fs::metadata(path)
                && metadata.len() > self.max_file_size
            {
                tracing::warn!(
                    "Skipping {} ({} bytes exceeds max_file_size {})",
                    path.display(),
                    metadata.len(),
                    self.max_file_size
                );
                selection.oversized.push(path.to_path_buf());
                continue;
            }

            selection.files.push(path.to_path_buf());
        }

        selection.files.sort();
        selection.oversized.sort();
        tracing::info!(
            "Found {} files to chunk in {} ({} over the size limit)",
            selection.files.len(),
            root.display(),
            selection.oversized.len()
        );
        Ok(selection)
    }

    pub(crate) fn has_allowed_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.contains(&ext.to_lowercase()))
    }
}
