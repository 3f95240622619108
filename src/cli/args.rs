//! CLI argument definitions.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::eval::DEFAULT_TOLERANCE_PCT;

/// cotejar: INT8 accuracy regression checks
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "cotejar")]
#[command(author = "PAIML")]
#[command(version)]
#[command(about = "Check a compiled INT8 classifier's accuracy against its FP32 baseline")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Run the accuracy-regression check against a checkpoint
    Check(CheckArgs),

    /// Download and verify the CIFAR-10 test data
    Fetch(FetchArgs),

    /// Display information about a checkpoint
    Info(InfoArgs),
}

/// Output format for reports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// Machine-readable JSON
    Json,
}

/// Arguments for the check command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct CheckArgs {
    /// Path to the SafeTensors checkpoint
    #[arg(value_name = "MODEL")]
    pub model: PathBuf,

    /// Architecture config (JSON); defaults to the VGG16 layout
    #[arg(long)]
    pub arch: Option<PathBuf>,

    /// Dataset directory (downloaded into the cache when omitted)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Allowed |FP32 - INT8| accuracy delta, in percentage points
    #[arg(short, long, default_value_t = DEFAULT_TOLERANCE_PCT)]
    pub tolerance: f64,

    /// Evaluation batch size
    #[arg(short, long, default_value_t = 16)]
    pub batch_size: usize,

    /// Evaluate at most this many batches per pass
    #[arg(long)]
    pub max_batches: Option<usize>,

    /// Batches to observe when the checkpoint has no QAT ranges
    #[arg(long, default_value_t = 10)]
    pub calibration_batches: usize,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the fetch command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct FetchArgs {
    /// Dataset directory (defaults to the cache)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Require the archive to match this SHA-256 digest
    #[arg(long)]
    pub sha256: Option<String>,
}

/// Arguments for the info command
#[derive(Parser, Debug, Clone, PartialEq)]
pub struct InfoArgs {
    /// Path to the SafeTensors checkpoint
    #[arg(value_name = "MODEL")]
    pub model: PathBuf,

    /// Report format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}
