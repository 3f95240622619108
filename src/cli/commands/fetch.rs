//! Fetch command implementation: pre-download the dataset.

use crate::cli::args::FetchArgs;
use crate::cli::logging::{log, LogLevel};
use crate::data::{DatasetFetcher, CIFAR10_URL};
use crate::Result;

pub fn run_fetch(args: FetchArgs, level: LogLevel) -> Result<()> {
    let mut fetcher = DatasetFetcher::new();
    if let Some(dir) = args.data_dir {
        fetcher = fetcher.data_dir(dir);
    }
    if let Some(digest) = args.sha256 {
        fetcher = fetcher.pin_sha256(digest);
    }

    if fetcher.is_cached() {
        log(
            level,
            LogLevel::Normal,
            &format!("CIFAR-10 already present in {}", fetcher.batches_dir().display()),
        );
        return Ok(());
    }

    log(
        level,
        LogLevel::Normal,
        &format!("Downloading CIFAR-10 from {CIFAR10_URL}"),
    );
    let dir = fetcher.fetch()?;
    log(
        level,
        LogLevel::Normal,
        &format!("Extracted to {}", dir.display()),
    );
    Ok(())
}
