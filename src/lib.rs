//! Labeldup: label-geometry duplicate detection for YOLO datasets.
//!
//! Labeldup finds images in an object-detection dataset whose annotations
//! describe the same content (same classes, boxes overlapping above an IoU
//! threshold) and moves or deletes the redundant copies. Only label files
//! are compared; image pixels are never read.
//!
//! # Modules
//!
//! - [`label`]: bounding boxes, IoU and tolerant YOLO label reading
//! - [`matcher`]: class-aware comparison of two label sets
//! - [`grouping`]: chain grouping of consecutive near-duplicates
//! - [`rules`]: per-dataset action selection from path patterns
//! - [`reorganize`]: moving or deleting duplicate files
//! - [`discover`]: finding dataset roots under a directory
//! - [`pipeline`]: running all of the above per dataset root
//! - [`events`]: progress events and reporters
//! - [`logging`]: tracing subscriber setup for the binary
//! - [`error`]: Error types for labeldup operations

pub mod discover;
pub mod error;
pub mod events;
pub mod grouping;
pub mod label;
pub mod logging;
pub mod matcher;
pub mod pipeline;
pub mod reorganize;
pub mod rules;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use error::LabeldupError;

use events::{Reporter, StdoutReporter, TracingReporter};
use pipeline::{run_all, DedupOptions, RunReport};
use rules::{load_rules_file, parse_rules_json, resolve_rule, Action, Rule};

const DEFAULT_IOU_THRESHOLD: f64 = 0.8;

/// The labeldup CLI application.
#[derive(Parser)]
#[command(name = "labeldup")]
#[command(version, about)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Find duplicates under a directory and move or delete them.
    Run(DedupArgs),
    /// Find duplicates under a directory without changing any file.
    Scan(DedupArgs),
    /// Show the duplicate rule that applies to a dataset path.
    Rule(RuleArgs),
}

/// Arguments shared by run and scan.
#[derive(clap::Args)]
struct DedupArgs {
    /// Directory to search for datasets (folders with images/ and labels/).
    root: PathBuf,

    /// IoU threshold (0-1) for two boxes to count as the same object.
    #[arg(long, env = "DEFAULT_IOU_THRESHOLD", default_value_t = DEFAULT_IOU_THRESHOLD)]
    iou_threshold: f64,

    /// Handle whole groups, keeper included, each in its own group_NNNN folder.
    #[arg(long, env = "DEFAULT_DEBUG_MODE")]
    debug: bool,

    #[command(flatten)]
    rules: RuleConfigArgs,

    /// Output format ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Arguments for the rule subcommand.
#[derive(clap::Args)]
struct RuleArgs {
    /// Dataset path to resolve.
    path: String,

    #[command(flatten)]
    rules: RuleConfigArgs,

    /// Output format ('text' or 'json').
    #[arg(long, default_value = "text")]
    output: String,
}

/// Where duplicate rules come from.
#[derive(clap::Args)]
struct RuleConfigArgs {
    /// Rules as a JSON array of {pattern, action, labels, priority} records.
    #[arg(long, env = "DUPLICATE_RULES")]
    rules: Option<String>,

    /// Rules file (.json, or .yaml/.yml), appended after --rules.
    #[arg(long, value_name = "FILE")]
    rules_file: Option<PathBuf>,

    /// Action when no rule pattern matches the dataset path.
    #[arg(long, env = "DUPLICATE_DEFAULT_ACTION", value_enum, ignore_case = true, default_value_t = Action::Move)]
    default_action: Action,
}

impl RuleConfigArgs {
    fn load(&self) -> Result<Vec<Rule>, LabeldupError> {
        let mut rules = match &self.rules {
            Some(text) => parse_rules_json(text, "--rules/DUPLICATE_RULES")?,
            None => Vec::new(),
        };
        if let Some(path) = &self.rules_file {
            rules.extend(load_rules_file(path)?);
        }
        Ok(rules)
    }
}

/// Run the labeldup CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), LabeldupError> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Run(args)) => run_dedup(args, false),
        Some(Commands::Scan(args)) => run_dedup(args, true),
        Some(Commands::Rule(args)) => run_rule(args),
        None => {
            println!("labeldup {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Find and reorganize near-duplicate images in YOLO datasets.");
            println!();
            println!("Run 'labeldup --help' for usage information.");
            Ok(())
        }
    }
}

/// Clamp a threshold into [0, 1]; NaN falls back to the default.
fn clamp_threshold(value: f64) -> f64 {
    if value.is_nan() {
        tracing::warn!("IoU threshold is NaN, using {DEFAULT_IOU_THRESHOLD}");
        return DEFAULT_IOU_THRESHOLD;
    }
    value.clamp(0.0, 1.0)
}

/// Execute the run and scan subcommands.
fn run_dedup(args: DedupArgs, dry_run: bool) -> Result<(), LabeldupError> {
    let json = match args.output.as_str() {
        "json" => true,
        "text" => false,
        other => {
            return Err(LabeldupError::UnsupportedFormat(format!(
                "'{}' (supported: text, json)",
                other
            )));
        }
    };

    let opts = DedupOptions {
        iou_threshold: clamp_threshold(args.iou_threshold),
        debug: args.debug,
        rules: args.rules.load()?,
        default_action: args.rules.default_action,
        dry_run,
    };

    let mut stdout_reporter = StdoutReporter;
    let mut tracing_reporter = TracingReporter;
    let reporter: &mut dyn Reporter = if json {
        &mut tracing_reporter
    } else {
        &mut stdout_reporter
    };

    let report = run_all(&args.root, &opts, reporter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text_summary(&report, dry_run);
    }

    let failures = report.failure_count();
    if failures > 0 {
        return Err(LabeldupError::OperationsFailed { failures });
    }
    Ok(())
}

fn print_text_summary(report: &RunReport, dry_run: bool) {
    if report.datasets.is_empty() {
        return;
    }

    println!();
    if dry_run {
        for dataset in report.datasets.iter().filter(|d| !d.groups.is_empty()) {
            print!("{dataset}");
        }
    } else {
        for dataset in report.datasets.iter().filter(|d| d.failures() > 0) {
            print!("{dataset}");
        }
    }
    print!("{report}");
}

/// Execute the rule subcommand.
fn run_rule(args: RuleArgs) -> Result<(), LabeldupError> {
    let rules = args.rules.load()?;
    let rule = resolve_rule(&args.path, &rules, args.rules.default_action);

    match args.output.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&rule)?),
        "text" => println!("{rule}"),
        other => {
            return Err(LabeldupError::UnsupportedFormat(format!(
                "'{}' (supported: text, json)",
                other
            )));
        }
    }

    Ok(())
}
