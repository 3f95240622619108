//! cotejar CLI
//!
//! Accuracy-regression entry point: exit code 0 when the compiled model
//! stays within tolerance, 1 on regression or any error.
//!
//! # Usage
//!
//! ```bash
//! # Run the INT8 regression check against a QAT checkpoint
//! cotejar check trained_vgg16_qat.safetensors
//!
//! # Tighter tolerance, capped evaluation
//! cotejar check model.safetensors --tolerance 1.0 --max-batches 100
//!
//! # Pre-download the dataset
//! cotejar fetch
//!
//! # Inspect a checkpoint
//! cotejar info model.safetensors
//! ```

use clap::Parser;
use cotejar::cli::{run_command, Cli};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
