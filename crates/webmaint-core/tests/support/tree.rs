//! Scratch project trees.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Create a temp directory holding `files` (relative path, contents).
pub fn project(files: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().expect("temp dir");
    for (rel, contents) in files {
        write(temp.path(), rel, contents);
    }
    temp
}

/// Write a file, creating parent directories.
pub fn write(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dirs");
    }
    fs::write(&path, contents).expect("write file");
    path
}

pub fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).expect("read file")
}
