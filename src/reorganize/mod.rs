//! Applying a duplicate handling action to the files of a dataset.
//!
//! Every entry is handled file by file: a failure on the image does not
//! stop the label from being attempted, and neither stops the run. Each
//! outcome lands in the [`ReorganizeReport`].
//!
//! Nothing here locks the dataset. Running two reorganizations (or any
//! other writer) against the same root at once can race on target names.

mod report;

pub use report::{EntryRecord, FileOutcome, ReorganizeReport};

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::events::{DedupEvent, Reporter};
use crate::grouping::DuplicateGroup;
use crate::label::io_yolo::{sibling_label_path, LABEL_EXTENSION};
use crate::rules::Action;

/// Directory under a dataset root that receives moved duplicates.
pub const DUPLICATE_DIR: &str = "duplicate";

/// Content written in place of a duplicate's missing label file.
pub const MISSING_LABEL_PLACEHOLDER: &str = "# Label file was missing for this duplicate\n";

/// Reorganize options.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReorganizeOptions {
    pub action: Action,
    /// Handle whole groups, keeper included, and keep groups apart.
    pub debug: bool,
}

/// Apply `opts.action` to `groups`, whose indices point into `images`.
///
/// `dataset_root` must be the directory holding `images/` and `labels/`.
/// A `Skip` action leaves every file untouched.
pub fn reorganize(
    dataset_root: &Path,
    images: &[PathBuf],
    groups: &[DuplicateGroup],
    opts: &ReorganizeOptions,
    reporter: &mut dyn Reporter,
) -> ReorganizeReport {
    match opts.action {
        Action::Delete => delete_duplicates(dataset_root, images, groups, opts.debug, reporter),
        Action::Move => move_duplicates(dataset_root, images, groups, opts.debug, reporter),
        Action::Skip => ReorganizeReport::new(Action::Skip, opts.debug, groups.len()),
    }
}

fn delete_duplicates(
    dataset_root: &Path,
    images: &[PathBuf],
    groups: &[DuplicateGroup],
    debug: bool,
    reporter: &mut dyn Reporter,
) -> ReorganizeReport {
    let mut report = ReorganizeReport::new(Action::Delete, debug, groups.len());

    for (idx, group) in groups.iter().enumerate() {
        let group_no = idx + 1;
        let targets = if debug {
            group.members()
        } else {
            report.kept += 1;
            group.duplicates()
        };

        for &member in targets {
            let image = &images[member];
            let label = sibling_label_path(dataset_root, image);

            let image_outcome = remove_file(image);
            let label_outcome = remove_file(&label);

            report.record(EntryRecord {
                group: group_no,
                image: image.clone(),
                label,
                image_outcome,
                label_outcome,
            });
        }

        if debug {
            reporter.report(DedupEvent::GroupDeleted {
                group: group_no,
                count: group.len(),
            });
        } else {
            reporter.report(DedupEvent::KeptAndDeleted {
                kept: images[group.keeper()].clone(),
                deleted: group.len() - 1,
            });
        }
    }

    report
}

fn move_duplicates(
    dataset_root: &Path,
    images: &[PathBuf],
    groups: &[DuplicateGroup],
    debug: bool,
    reporter: &mut dyn Reporter,
) -> ReorganizeReport {
    let mut report = ReorganizeReport::new(Action::Move, debug, groups.len());

    let dup_root = dataset_root.join(DUPLICATE_DIR);
    let dup_images = dup_root.join("images");
    let dup_labels = dup_root.join("labels");
    ensure_dir(&dup_images);
    ensure_dir(&dup_labels);

    for (idx, group) in groups.iter().enumerate() {
        let group_no = idx + 1;

        let (images_dir, labels_dir) = if debug {
            let group_name = format!("group_{group_no:04}");
            let dirs = (dup_images.join(&group_name), dup_labels.join(&group_name));
            ensure_dir(&dirs.0);
            ensure_dir(&dirs.1);
            dirs
        } else {
            (dup_images.clone(), dup_labels.clone())
        };

        let targets = if debug {
            group.members()
        } else {
            report.kept += 1;
            group.duplicates()
        };

        for &member in targets {
            let image = &images[member];
            let label = sibling_label_path(dataset_root, image);
            let file_name = image.file_name().map(OsString::from).unwrap_or_default();

            let (image_target, label_target) = if debug {
                (
                    images_dir.join(&file_name),
                    labels_dir.join(label_file_name(&file_name)),
                )
            } else {
                unique_target_paths(&images_dir, &labels_dir, &file_name)
            };

            let image_outcome = move_file(image, &image_target);
            let label_outcome = if label.exists() {
                move_file(&label, &label_target)
            } else {
                write_placeholder(&label_target)
            };

            report.record(EntryRecord {
                group: group_no,
                image: image.clone(),
                label,
                image_outcome,
                label_outcome,
            });
        }

        if debug {
            reporter.report(DedupEvent::GroupMoved {
                count: group.len(),
                to: images_dir,
            });
        } else {
            reporter.report(DedupEvent::KeptAndMoved {
                kept: images[group.keeper()].clone(),
                moved: group.len() - 1,
                to: dup_root.clone(),
            });
        }
    }

    report
}

/// Pick image and label targets for `file_name` that do not collide with
/// existing files.
///
/// The original name is tried first, then `<stem>_dup1<.ext>`,
/// `<stem>_dup2<.ext>`, ... A candidate is taken only when neither its
/// image path nor its `.txt` label path exists.
pub fn unique_target_paths(
    images_dir: &Path,
    labels_dir: &Path,
    file_name: &OsStr,
) -> (PathBuf, PathBuf) {
    let as_path = Path::new(file_name);
    let stem = as_path.file_stem().map(OsString::from).unwrap_or_default();
    let extension = as_path.extension().map(OsString::from);

    let mut candidate = file_name.to_os_string();
    let mut idx: u64 = 1;
    loop {
        let image_target = images_dir.join(&candidate);
        let label_target = labels_dir.join(label_file_name(&candidate));
        if !image_target.exists() && !label_target.exists() {
            return (image_target, label_target);
        }

        candidate = stem.clone();
        candidate.push(format!("_dup{idx}"));
        if let Some(ext) = &extension {
            candidate.push(".");
            candidate.push(ext);
        }
        idx += 1;
    }
}

/// `<stem>.txt` for an image file name.
fn label_file_name(image_file_name: &OsStr) -> OsString {
    let mut name = Path::new(image_file_name)
        .file_stem()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(".");
    name.push(LABEL_EXTENSION);
    name
}

fn ensure_dir(dir: &Path) {
    if let Err(err) = fs::create_dir_all(dir) {
        tracing::warn!(dir = %dir.display(), error = %err, "could not create directory");
    }
}

fn remove_file(path: &Path) -> FileOutcome {
    match fs::remove_file(path) {
        Ok(()) => {
            tracing::debug!(path = %path.display(), "deleted");
            FileOutcome::Deleted
        }
        Err(err) if err.kind() == ErrorKind::NotFound => FileOutcome::Missing,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "delete failed");
            FileOutcome::Failed {
                message: err.to_string(),
            }
        }
    }
}

fn move_file(from: &Path, to: &Path) -> FileOutcome {
    if !from.exists() {
        return FileOutcome::Missing;
    }

    let result = match to.parent() {
        Some(parent) => fs::create_dir_all(parent),
        None => Ok(()),
    }
    .and_then(|()| fs::rename(from, to));

    match result {
        Ok(()) => {
            tracing::debug!(from = %from.display(), to = %to.display(), "moved");
            FileOutcome::Moved {
                to: to.to_path_buf(),
            }
        }
        Err(err) => {
            tracing::warn!(from = %from.display(), to = %to.display(), error = %err, "move failed");
            FileOutcome::Failed {
                message: err.to_string(),
            }
        }
    }
}

fn write_placeholder(to: &Path) -> FileOutcome {
    let result = match to.parent() {
        Some(parent) => fs::create_dir_all(parent),
        None => Ok(()),
    }
    .and_then(|()| fs::write(to, MISSING_LABEL_PLACEHOLDER));

    match result {
        Ok(()) => FileOutcome::PlaceholderWritten {
            to: to.to_path_buf(),
        },
        Err(err) => {
            tracing::warn!(path = %to.display(), error = %err, "placeholder write failed");
            FileOutcome::Failed {
                message: err.to_string(),
            }
        }
    }
}
