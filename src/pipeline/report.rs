//! Per-dataset and per-run result types.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

use crate::reorganize::ReorganizeReport;
use crate::rules::EffectiveRule;

/// How processing of one dataset root ended.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatasetStatus {
    /// The effective rule said `skip`.
    Skipped,
    /// `images/` or `labels/` is missing.
    MissingLayout,
    NoImages,
    NoDuplicates,
    /// Groups were found (and reorganized unless scanning).
    Processed,
    /// The dataset could not be processed; other datasets still were.
    Failed { message: String },
}

/// One duplicate group with its paths resolved.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GroupPaths {
    pub keeper: PathBuf,
    pub duplicates: Vec<PathBuf>,
}

/// Result of processing one dataset root.
#[derive(Clone, Debug, Serialize)]
pub struct DatasetReport {
    pub root: PathBuf,
    pub rule: EffectiveRule,
    #[serde(flatten)]
    pub status: DatasetStatus,
    pub image_count: usize,
    pub groups: Vec<GroupPaths>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reorganize: Option<ReorganizeReport>,
}

impl DatasetReport {
    pub(crate) fn new(root: PathBuf, rule: EffectiveRule, status: DatasetStatus) -> Self {
        Self {
            root,
            rule,
            status,
            image_count: 0,
            groups: Vec::new(),
            log_path: None,
            reorganize: None,
        }
    }

    /// Number of file operations that failed during reorganization.
    pub fn failures(&self) -> usize {
        self.reorganize.as_ref().map(|r| r.failures).unwrap_or(0)
    }
}

impl fmt::Display for DatasetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Dataset: {}", self.root.display())?;
        writeln!(f, "  rule:   {}", self.rule)?;
        match &self.status {
            DatasetStatus::Failed { message } => writeln!(f, "  status: failed ({message})")?,
            status => writeln!(f, "  status: {}", status_name(status))?,
        }
        writeln!(f, "  images: {}", self.image_count)?;

        for (idx, group) in self.groups.iter().enumerate() {
            writeln!(f, "  Group {}:", idx + 1)?;
            writeln!(f, "    keep {}", group.keeper.display())?;
            for dup in &group.duplicates {
                writeln!(f, "    dup  {}", dup.display())?;
            }
        }

        if let Some(reorganize) = &self.reorganize {
            for line in reorganize.to_string().lines() {
                writeln!(f, "  {line}")?;
            }
        }

        Ok(())
    }
}

fn status_name(status: &DatasetStatus) -> &'static str {
    match status {
        DatasetStatus::Skipped => "skipped",
        DatasetStatus::MissingLayout => "missing images/ or labels/",
        DatasetStatus::NoImages => "no images",
        DatasetStatus::NoDuplicates => "no duplicates",
        DatasetStatus::Processed => "processed",
        DatasetStatus::Failed { .. } => "failed",
    }
}

/// Result of processing every dataset root under a directory.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    pub root: PathBuf,
    pub datasets: Vec<DatasetReport>,
}

impl RunReport {
    pub fn group_count(&self) -> usize {
        self.datasets.iter().map(|d| d.groups.len()).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.datasets
            .iter()
            .map(|d| {
                d.failures()
                    + usize::from(matches!(d.status, DatasetStatus::Failed { .. }))
            })
            .sum()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Summary: {} dataset(s), {} duplicate group(s), {} failure(s)",
            self.datasets.len(),
            self.group_count(),
            self.failure_count()
        )
    }
}
