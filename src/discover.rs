//! Finding dataset roots under a directory tree.

use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::error::LabeldupError;
use crate::reorganize::DUPLICATE_DIR;

/// Child directories that are never descended into: data areas of a
/// dataset and the output of a previous reorganization.
const PRUNED_DIRS: [&str; 3] = ["images", "labels", DUPLICATE_DIR];

/// Whether `dir` directly contains both `images/` and `labels/`.
pub fn is_dataset_root(dir: &Path) -> bool {
    dir.join("images").is_dir() && dir.join("labels").is_dir()
}

/// Walk `root` top-down and return every dataset root, in walk order
/// (siblings sorted by name). `root` itself qualifies too.
pub fn find_dataset_roots(root: &Path) -> Result<Vec<PathBuf>, LabeldupError> {
    if !root.is_dir() {
        return Err(LabeldupError::NotADirectory(root.to_path_buf()));
    }

    let mut roots = Vec::new();

    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_pruned(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable directory");
                continue;
            }
        };

        if entry.file_type().is_dir() && is_dataset_root(entry.path()) {
            tracing::debug!(root = %entry.path().display(), "dataset root");
            roots.push(entry.path().to_path_buf());
        }
    }

    Ok(roots)
}

fn is_pruned(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| PRUNED_DIRS.contains(&name))
            .unwrap_or(false)
}
