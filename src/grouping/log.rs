//! Plain-text log of confirmed matches, one block per pair.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::LabeldupError;

/// Name of the match log for a run started at `started`:
/// `similar_path_YYYYmmdd_HHMMSS.txt`.
pub fn match_log_file_name(started: &DateTime<Local>) -> String {
    format!("similar_path_{}.txt", started.format("%Y%m%d_%H%M%S"))
}

/// Writer for match log blocks.
pub struct MatchLog<W: Write> {
    out: W,
}

impl MatchLog<BufWriter<File>> {
    /// Create a timestamped log file in `dir` (the current directory when
    /// `dir` is empty). Returns the log and its path.
    pub fn create_in(dir: &Path, started: &DateTime<Local>) -> Result<(Self, PathBuf), LabeldupError> {
        let dir = if dir.as_os_str().is_empty() {
            Path::new(".")
        } else {
            dir
        };
        let path = dir.join(match_log_file_name(started));
        let file = File::create(&path).map_err(|source| LabeldupError::MatchLog {
            path: path.clone(),
            source,
        })?;
        Ok((Self::new(BufWriter::new(file)), path))
    }
}

impl<W: Write> MatchLog<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Append one match block.
    pub fn record(
        &mut self,
        iou_threshold: f64,
        base: &Path,
        matched: &Path,
    ) -> std::io::Result<()> {
        writeln!(self.out, "Similar labels (IoU >= {iou_threshold:?})")?;
        writeln!(self.out, "  base: {}", base.display())?;
        writeln!(self.out, "  match: {}", matched.display())
    }

    /// Flush and hand back the underlying writer.
    pub fn finish(mut self) -> std::io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}
