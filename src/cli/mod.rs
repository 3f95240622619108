//! CLI module for cotejar.
//!
//! This module contains the argument definitions, command handlers, and
//! output utilities.

mod args;
mod commands;
mod logging;

pub use args::{parse_args, CheckArgs, Cli, Command, FetchArgs, InfoArgs, OutputFormat};
pub use commands::run_command;
pub use logging::LogLevel;
