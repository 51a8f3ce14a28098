//! Source file discovery for the guard patcher.
//!
//! Walks a project tree and returns the files whose extension is on the
//! configured list. A directory whose root-relative path contains any entry
//! of the exclusion list (`.git` and `node_modules` by default) is pruned
//! before descending into it, so nothing under it is ever read or
//! rewritten. Matching is by substring: `.github/` and `node_modules_old/`
//! are pruned too.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use crate::config::GuardConfig;

/// Options controlling which files are collected.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Extensions without the leading dot (`ts`, `tsx`, ...).
    pub extensions: Vec<String>,
    /// Substrings that prune any directory path containing them.
    pub exclude_dirs: Vec<String>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        WalkOptions::from(&GuardConfig::default())
    }
}

impl From<&GuardConfig> for WalkOptions {
    fn from(config: &GuardConfig) -> Self {
        WalkOptions {
            extensions: config
                .extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .collect(),
            exclude_dirs: config.exclude_dirs.clone(),
        }
    }
}

impl WalkOptions {
    /// Check whether a root-relative directory path contains an excluded name.
    pub fn is_excluded(&self, rel_dir: &Path) -> bool {
        let rel_dir = rel_dir.to_string_lossy().replace('\\', "/");
        self.exclude_dirs
            .iter()
            .any(|d| !d.is_empty() && rel_dir.contains(d.as_str()))
    }

    /// Check whether a path has one of the configured extensions.
    pub fn has_source_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| self.extensions.iter().any(|e| e == ext))
            .unwrap_or(false)
    }

    fn keep_entry(&self, root: &Path, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let rel_path = entry.path().strip_prefix(root).unwrap_or(entry.path());
        if self.is_excluded(rel_path) {
            debug!("Pruned: {}", rel_path.display());
            return false;
        }
        true
    }
}

/// Collect candidate source files under `root`, sorted by path.
///
/// Symlinks are not followed. Entries that cannot be read are logged and
/// skipped rather than aborting the walk.
pub fn collect_source_files(root: &Path, options: &WalkOptions) -> Vec<PathBuf> {
    let mut files = Vec::new();

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| options.keep_entry(root, entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let rel_dir = path
            .strip_prefix(root)
            .unwrap_or(path)
            .parent()
            .unwrap_or(Path::new(""));
        if options.is_excluded(rel_dir) {
            continue;
        }
        if options.has_source_extension(path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();
    files
}

// ============================================================================
// Tests
// ============================================================================
