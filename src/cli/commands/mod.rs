//! Command dispatch.

mod check;
mod fetch;
mod info;

use super::args::{Cli, Command};
use super::logging::LogLevel;
use crate::Result;

/// Execute the parsed CLI command.
pub fn run_command(cli: Cli) -> Result<()> {
    let level = LogLevel::from_flags(cli.verbose, cli.quiet);
    match cli.command {
        Command::Check(args) => check::run_check(args, level),
        Command::Fetch(args) => fetch::run_fetch(args, level),
        Command::Info(args) => info::run_info(args, level),
    }
}
