use std::path::PathBuf;
use thiserror::Error;

/// The main error type for labeldup operations.
///
/// Per-file failures during reorganization are not represented here; they
/// are recorded in the reorganize report and the run continues.
#[derive(Debug, Error)]
pub enum LabeldupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse duplicate rules from {origin}: {message}")]
    RulesParse { origin: String, message: String },

    #[error("Failed to create match log {path}: {source}")]
    MatchLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to write JSON report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{failures} file operation(s) failed; see the report above")]
    OperationsFailed { failures: usize },
}
