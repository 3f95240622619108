//! Dataset archive download, verification, and unpacking.
//!
//! The CIFAR-10 binary archive is downloaded on first use into a cache
//! directory and unpacked there; later runs find the extracted files and
//! skip the network entirely. Upstream publishes only an MD5 for the
//! archive, so the fetcher always computes and reports the SHA-256 digest
//! and verifies it when a pin is supplied.

use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

use crate::{CotejarError, Result};

use super::cifar::{BATCHES_DIR, TEST_BATCH_FILE};

/// Upstream location of the binary-format archive
pub const CIFAR10_URL: &str = "https://www.cs.toronto.edu/~kriz/cifar-10-binary.tar.gz";

/// Downloads and unpacks the CIFAR-10 binary archive with caching.
pub struct DatasetFetcher {
    data_dir: PathBuf,
    url: String,
    pinned_sha256: Option<String>,
}

impl DatasetFetcher {
    /// Create a fetcher using the default cache directory.
    pub fn new() -> Self {
        let data_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("cotejar")
            .join("cifar-10");
        Self {
            data_dir,
            url: CIFAR10_URL.to_string(),
            pinned_sha256: None,
        }
    }

    /// Set the dataset directory.
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Override the archive URL (mirrors, local servers).
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Require the archive to match a SHA-256 digest (lowercase hex).
    #[must_use]
    pub fn pin_sha256(mut self, digest: impl Into<String>) -> Self {
        self.pinned_sha256 = Some(digest.into());
        self
    }

    /// Directory the extracted batch files live in.
    pub fn batches_dir(&self) -> PathBuf {
        self.data_dir.join(BATCHES_DIR)
    }

    /// Whether the test split is already extracted.
    pub fn is_cached(&self) -> bool {
        self.batches_dir().join(TEST_BATCH_FILE).exists()
            || self.data_dir.join(TEST_BATCH_FILE).exists()
    }

    /// Ensure the dataset is present, downloading on first use.
    ///
    /// Returns the directory to hand to
    /// [`CifarDataset::load_test_split`](super::CifarDataset::load_test_split).
    pub fn fetch(&self) -> Result<PathBuf> {
        if self.is_cached() {
            return Ok(self.data_dir.clone());
        }

        std::fs::create_dir_all(&self.data_dir)
            .map_err(|e| CotejarError::io(format!("creating {}", self.data_dir.display()), e))?;

        let archive = self.download()?;
        self.verify(&archive)?;
        self.unpack(&archive)?;

        if !self.is_cached() {
            return Err(CotejarError::Dataset {
                path: self.data_dir.clone(),
                message: format!("archive unpacked but {TEST_BATCH_FILE} was not found"),
            });
        }
        Ok(self.data_dir.clone())
    }

    fn download(&self) -> Result<Vec<u8>> {
        let response = reqwest::blocking::get(&self.url)
            .and_then(reqwest::blocking::Response::error_for_status)
            .map_err(|e| CotejarError::Download {
                url: self.url.clone(),
                message: e.to_string(),
            })?;
        let bytes = response.bytes().map_err(|e| CotejarError::Download {
            url: self.url.clone(),
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }

    /// Check the archive digest against the pin, if one is set.
    pub fn verify(&self, archive: &[u8]) -> Result<String> {
        let actual = sha256_hex(archive);
        if let Some(expected) = &self.pinned_sha256 {
            if !expected.eq_ignore_ascii_case(&actual) {
                return Err(CotejarError::CorruptArchive {
                    path: self.data_dir.clone(),
                    expected: expected.clone(),
                    actual,
                });
            }
        }
        Ok(actual)
    }

    fn unpack(&self, archive: &[u8]) -> Result<()> {
        let decoder = flate2::read::GzDecoder::new(archive);
        tar::Archive::new(decoder)
            .unpack(&self.data_dir)
            .map_err(|e| CotejarError::io(format!("unpacking into {}", self.data_dir.display()), e))
    }
}

impl Default for DatasetFetcher {
    fn default() -> Self {
        Self::new()
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Resolve a dataset directory: an explicit path is used as-is (and must
/// already contain the data), otherwise the cache is used and populated.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(dir) => {
            let fetcher = DatasetFetcher::new().data_dir(dir);
            if fetcher.is_cached() {
                Ok(dir.to_path_buf())
            } else {
                fetcher.fetch()
            }
        }
        None => DatasetFetcher::new().fetch(),
    }
}
