//! Progress events and the sinks that receive them.
//!
//! The pipeline never prints directly. It hands every progress message to
//! a [`Reporter`], in the order they happen, so the CLI can print them,
//! route them to tracing, or tests can collect them.

use std::fmt;
use std::path::PathBuf;

use crate::rules::EffectiveRule;

/// One progress message.
#[derive(Clone, Debug, PartialEq)]
pub enum DedupEvent {
    DatasetsFound { count: usize },
    NoDatasets,
    DatasetStarted { root: PathBuf },
    RuleResolved { rule: EffectiveRule },
    Skipped,
    ImageDir { path: PathBuf },
    LabelDir { path: PathBuf },
    MissingLayout,
    NoImages,
    Analyzing { count: usize, iou_threshold: f64 },
    LabelsLimit { limit: usize },
    FindingDuplicates { count: usize, iou_threshold: f64 },
    /// Debug-mode delete of a whole group (1-based index).
    GroupDeleted { group: usize, count: usize },
    KeptAndDeleted { kept: PathBuf, deleted: usize },
    /// Debug-mode move of a whole group into its own folder.
    GroupMoved { count: usize, to: PathBuf },
    KeptAndMoved { kept: PathBuf, moved: usize, to: PathBuf },
    NoDuplicates,
    GroupsDetected { count: usize },
}

impl fmt::Display for DedupEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupEvent::DatasetsFound { count } => write!(f, "Found {count} dataset(s)."),
            DedupEvent::NoDatasets => {
                write!(f, "No datasets found (missing images/ and labels/ folders).")
            }
            DedupEvent::DatasetStarted { root } => {
                write!(f, "\n--- Dataset: {} ---", root.display())
            }
            DedupEvent::RuleResolved { rule } => write!(
                f,
                "Duplicate handling rule: action={}, labels={}",
                rule.action, rule.labels_limit
            ),
            DedupEvent::Skipped => write!(f, "Skipping duplicate detection (action=skip)"),
            DedupEvent::ImageDir { path } => write!(f, "Image directory: {}", path.display()),
            DedupEvent::LabelDir { path } => write!(f, "Label directory: {}", path.display()),
            DedupEvent::MissingLayout => write!(
                f,
                "Images or labels directory not found; skipping duplicate detection"
            ),
            DedupEvent::NoImages => write!(f, "No images found; skipping duplicate detection"),
            DedupEvent::Analyzing {
                count,
                iou_threshold,
            } => write!(
                f,
                "Analyzing {count} images for duplicates using IoU threshold {iou_threshold:?}"
            ),
            DedupEvent::LabelsLimit { limit } => write!(
                f,
                "Labels limit: comparing only first {limit} labels for duplicate detection"
            ),
            DedupEvent::FindingDuplicates {
                count,
                iou_threshold,
            } => write!(
                f,
                "Finding duplicates in {count} images using IoU threshold {iou_threshold:?}"
            ),
            DedupEvent::GroupDeleted { group, count } => {
                write!(f, "Deleted all {count} duplicates in group {group}")
            }
            DedupEvent::KeptAndDeleted { kept, deleted } => write!(
                f,
                "Kept original: {}; deleted {deleted} duplicates",
                kept.display()
            ),
            DedupEvent::GroupMoved { count, to } => {
                write!(f, "Moved all {count} duplicates to {}", to.display())
            }
            DedupEvent::KeptAndMoved { kept, moved, to } => write!(
                f,
                "Kept original: {}; moved {moved} duplicates to {}",
                kept.display(),
                to.display()
            ),
            DedupEvent::NoDuplicates => write!(f, "No duplicates found."),
            DedupEvent::GroupsDetected { count } => {
                write!(f, "Detected {count} duplicate group(s).")
            }
        }
    }
}

/// A sink for progress events.
pub trait Reporter {
    fn report(&mut self, event: DedupEvent);
}

/// Prints each event on its own line to stdout.
#[derive(Debug, Default)]
pub struct StdoutReporter;

impl Reporter for StdoutReporter {
    fn report(&mut self, event: DedupEvent) {
        println!("{event}");
    }
}

/// Forwards each event to `tracing` at info level.
///
/// Used when stdout carries machine-readable output.
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&mut self, event: DedupEvent) {
        let message = event.to_string();
        tracing::info!(target: "labeldup::progress", "{}", message.trim_start());
    }
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn report(&mut self, _event: DedupEvent) {}
}

impl Reporter for Vec<DedupEvent> {
    fn report(&mut self, event: DedupEvent) {
        self.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Action;

    #[test]
    fn messages_match_progress_text() {
        let rule = EffectiveRule {
            action: Action::Move,
            labels_limit: 2,
            matched_pattern: Some("cam".to_string()),
        };
        assert_eq!(
            DedupEvent::RuleResolved { rule }.to_string(),
            "Duplicate handling rule: action=move, labels=2"
        );
        assert_eq!(
            DedupEvent::Analyzing {
                count: 3,
                iou_threshold: 0.8
            }
            .to_string(),
            "Analyzing 3 images for duplicates using IoU threshold 0.8"
        );
        assert_eq!(
            DedupEvent::KeptAndMoved {
                kept: PathBuf::from("/d/images/a.jpg"),
                moved: 2,
                to: PathBuf::from("/d/duplicate"),
            }
            .to_string(),
            "Kept original: /d/images/a.jpg; moved 2 duplicates to /d/duplicate"
        );
        assert_eq!(
            DedupEvent::GroupsDetected { count: 1 }.to_string(),
            "Detected 1 duplicate group(s)."
        );
    }

    #[test]
    fn vec_reporter_collects_in_order() {
        let mut events: Vec<DedupEvent> = Vec::new();
        events.report(DedupEvent::NoImages);
        events.report(DedupEvent::NoDuplicates);
        assert_eq!(events, vec![DedupEvent::NoImages, DedupEvent::NoDuplicates]);
    }
}
