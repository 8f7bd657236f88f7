//! End-to-end duplicate handling for dataset roots.
//!
//! For each root: resolve the effective rule, list the images, read their
//! labels, group them, then apply the rule's action. Roots are processed
//! one after another, and within a root the grouping sweep and every file
//! operation run sequentially.

mod report;

pub use report::{DatasetReport, DatasetStatus, GroupPaths, RunReport};

use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::discover::find_dataset_roots;
use crate::error::LabeldupError;
use crate::events::{DedupEvent, Reporter};
use crate::grouping::{find_duplicate_groups_with, DuplicateGroup, GroupingOptions, MatchLog};
use crate::label::io_yolo::{list_images, read_label_sets};
use crate::reorganize::{reorganize, ReorganizeOptions};
use crate::rules::{resolve_rule, Action, Rule};

/// Options shared by every dataset of a run.
#[derive(Clone, Debug)]
pub struct DedupOptions {
    pub iou_threshold: f64,
    /// Reorganize whole groups into numbered folders.
    pub debug: bool,
    pub rules: Vec<Rule>,
    /// Action used when no rule pattern matches.
    pub default_action: Action,
    /// Find groups without touching any file (no reorganization, no match log).
    pub dry_run: bool,
}

impl Default for DedupOptions {
    fn default() -> Self {
        Self {
            iou_threshold: 0.8,
            debug: false,
            rules: Vec::new(),
            default_action: Action::Move,
            dry_run: false,
        }
    }
}

/// Discover every dataset root under `root` and handle each one.
///
/// A dataset that fails is recorded as [`DatasetStatus::Failed`] and the run
/// moves on. Only a missing or unreadable `root` is an error.
pub fn run_all(
    root: &Path,
    opts: &DedupOptions,
    reporter: &mut dyn Reporter,
) -> Result<RunReport, LabeldupError> {
    let dataset_roots = find_dataset_roots(root)?;
    let mut run = RunReport {
        root: root.to_path_buf(),
        datasets: Vec::with_capacity(dataset_roots.len()),
    };

    if dataset_roots.is_empty() {
        reporter.report(DedupEvent::NoDatasets);
        return Ok(run);
    }

    reporter.report(DedupEvent::DatasetsFound {
        count: dataset_roots.len(),
    });

    for dataset_root in dataset_roots {
        reporter.report(DedupEvent::DatasetStarted {
            root: dataset_root.clone(),
        });

        let report = match handle_duplicates(&dataset_root, opts, reporter) {
            Ok(report) => report,
            Err(err) => {
                tracing::error!(root = %dataset_root.display(), error = %err, "dataset failed");
                let rule = resolve_rule(
                    &dataset_root.to_string_lossy(),
                    &opts.rules,
                    opts.default_action,
                );
                DatasetReport::new(
                    dataset_root,
                    rule,
                    DatasetStatus::Failed {
                        message: err.to_string(),
                    },
                )
            }
        };
        run.datasets.push(report);
    }

    Ok(run)
}

/// Detect and handle duplicates in one dataset root.
pub fn handle_duplicates(
    dataset_root: &Path,
    opts: &DedupOptions,
    reporter: &mut dyn Reporter,
) -> Result<DatasetReport, LabeldupError> {
    let rule = resolve_rule(
        &dataset_root.to_string_lossy(),
        &opts.rules,
        opts.default_action,
    );
    reporter.report(DedupEvent::RuleResolved { rule: rule.clone() });

    let mut report = DatasetReport::new(dataset_root.to_path_buf(), rule, DatasetStatus::Skipped);

    if report.rule.action == Action::Skip {
        reporter.report(DedupEvent::Skipped);
        return Ok(report);
    }

    let images_dir = dataset_root.join("images");
    let labels_dir = dataset_root.join("labels");
    reporter.report(DedupEvent::ImageDir {
        path: images_dir.clone(),
    });
    reporter.report(DedupEvent::LabelDir {
        path: labels_dir.clone(),
    });

    if !images_dir.is_dir() || !labels_dir.is_dir() {
        reporter.report(DedupEvent::MissingLayout);
        report.status = DatasetStatus::MissingLayout;
        return Ok(report);
    }

    let images = list_images(&images_dir)?;
    report.image_count = images.len();
    if images.is_empty() {
        reporter.report(DedupEvent::NoImages);
        report.status = DatasetStatus::NoImages;
        return Ok(report);
    }

    reporter.report(DedupEvent::Analyzing {
        count: images.len(),
        iou_threshold: opts.iou_threshold,
    });

    let labels = read_label_sets(&images);
    let grouping = GroupingOptions {
        iou_threshold: opts.iou_threshold,
        labels_limit: report.rule.labels_limit,
    };

    if grouping.labels_limit > 0 {
        reporter.report(DedupEvent::LabelsLimit {
            limit: grouping.labels_limit,
        });
    }
    reporter.report(DedupEvent::FindingDuplicates {
        count: images.len(),
        iou_threshold: opts.iou_threshold,
    });

    let groups = if opts.dry_run {
        find_duplicate_groups_with(&labels, &grouping, |seed, candidate| {
            log_match(&images[seed], &images[candidate]);
        })
    } else {
        let (mut log, log_path) = MatchLog::create_in(dataset_root, &Local::now())?;
        let mut write_error: Option<io::Error> = None;

        let groups = find_duplicate_groups_with(&labels, &grouping, |seed, candidate| {
            log_match(&images[seed], &images[candidate]);
            if write_error.is_none() {
                let written = log.record(grouping.iou_threshold, &images[seed], &images[candidate]);
                write_error = written.err();
            }
        });

        let flushed = log.finish();
        if let Some(source) = write_error.or_else(|| flushed.err()) {
            return Err(LabeldupError::MatchLog {
                path: log_path,
                source,
            });
        }

        report.log_path = Some(log_path);
        groups
    };

    if groups.is_empty() {
        reporter.report(DedupEvent::NoDuplicates);
        report.status = DatasetStatus::NoDuplicates;
        return Ok(report);
    }

    report.groups = groups.iter().map(|g| group_paths(g, &images)).collect();

    if !opts.dry_run {
        let reorganize_opts = ReorganizeOptions {
            action: report.rule.action,
            debug: opts.debug,
        };
        let outcome = reorganize(dataset_root, &images, &groups, &reorganize_opts, reporter);
        tracing::info!(
            root = %dataset_root.display(),
            groups = outcome.groups,
            kept = outcome.kept,
            failures = outcome.failures,
            "reorganized"
        );
        report.reorganize = Some(outcome);
    }

    reporter.report(DedupEvent::GroupsDetected {
        count: groups.len(),
    });
    report.status = DatasetStatus::Processed;

    Ok(report)
}

fn log_match(base: &Path, candidate: &Path) {
    tracing::debug!(base = %base.display(), candidate = %candidate.display(), "similar labels");
}

fn group_paths(group: &DuplicateGroup, images: &[PathBuf]) -> GroupPaths {
    GroupPaths {
        keeper: images[group.keeper()].clone(),
        duplicates: group
            .duplicates()
            .iter()
            .map(|&idx| images[idx].clone())
            .collect(),
    }
}
