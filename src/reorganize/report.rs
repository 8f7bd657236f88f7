//! Reorganize report types and text formatting.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::rules::Action;

/// What happened to one file of one entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    Moved { to: PathBuf },
    Deleted,
    /// The file was not there; nothing was done.
    Missing,
    /// The label was missing, so a placeholder was written at the target.
    PlaceholderWritten { to: PathBuf },
    Failed { message: String },
}

impl FileOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, FileOutcome::Failed { .. })
    }
}

impl fmt::Display for FileOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileOutcome::Moved { to } => write!(f, "moved to {}", to.display()),
            FileOutcome::Deleted => write!(f, "deleted"),
            FileOutcome::Missing => write!(f, "missing"),
            FileOutcome::PlaceholderWritten { to } => {
                write!(f, "missing, placeholder written to {}", to.display())
            }
            FileOutcome::Failed { message } => write!(f, "FAILED: {message}"),
        }
    }
}

/// The image and label outcome for one relocated or removed entry.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntryRecord {
    /// 1-based group number.
    pub group: usize,
    pub image: PathBuf,
    pub label: PathBuf,
    pub image_outcome: FileOutcome,
    pub label_outcome: FileOutcome,
}

/// Summary of one reorganization.
#[derive(Clone, Debug, Default, Serialize)]
pub struct ReorganizeReport {
    pub action: Action,
    pub debug: bool,
    pub groups: usize,
    /// Keepers left in place (zero in debug mode).
    pub kept: usize,
    pub images_moved: usize,
    pub labels_moved: usize,
    pub images_deleted: usize,
    pub labels_deleted: usize,
    pub placeholders_written: usize,
    pub missing: usize,
    pub failures: usize,
    pub entries: Vec<EntryRecord>,
}

impl ReorganizeReport {
    pub(crate) fn new(action: Action, debug: bool, groups: usize) -> Self {
        Self {
            action,
            debug,
            groups,
            ..Default::default()
        }
    }

    pub(crate) fn record(&mut self, entry: EntryRecord) {
        self.count(&entry.image_outcome, true);
        self.count(&entry.label_outcome, false);
        self.entries.push(entry);
    }

    fn count(&mut self, outcome: &FileOutcome, is_image: bool) {
        match (outcome, is_image) {
            (FileOutcome::Moved { .. }, true) => self.images_moved += 1,
            (FileOutcome::Moved { .. }, false) => self.labels_moved += 1,
            (FileOutcome::Deleted, true) => self.images_deleted += 1,
            (FileOutcome::Deleted, false) => self.labels_deleted += 1,
            (FileOutcome::PlaceholderWritten { .. }, _) => self.placeholders_written += 1,
            (FileOutcome::Missing, _) => self.missing += 1,
            (FileOutcome::Failed { .. }, _) => self.failures += 1,
        }
    }

    /// Entries with at least one failed file operation.
    pub fn failed_entries(&self) -> impl Iterator<Item = &EntryRecord> {
        self.entries
            .iter()
            .filter(|e| e.image_outcome.is_failed() || e.label_outcome.is_failed())
    }
}

impl fmt::Display for ReorganizeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = if self.debug { " (debug)" } else { "" };
        writeln!(
            f,
            "Reorganized {} group(s) with action {}{}: {} kept",
            self.groups, self.action, mode, self.kept
        )?;
        match self.action {
            Action::Delete => writeln!(
                f,
                "  deleted:  {} image(s), {} label(s)",
                self.images_deleted, self.labels_deleted
            )?,
            _ => writeln!(
                f,
                "  moved:    {} image(s), {} label(s), {} placeholder(s)",
                self.images_moved, self.labels_moved, self.placeholders_written
            )?,
        }
        writeln!(f, "  missing:  {}", self.missing)?;
        writeln!(f, "  failures: {}", self.failures)?;

        for entry in self.failed_entries() {
            writeln!(
                f,
                "  - group {} {}: image {}; label {}",
                entry.group,
                entry.image.display(),
                entry.image_outcome,
                entry.label_outcome
            )?;
        }

        Ok(())
    }
}
