//! CIFAR-10 binary format parsing.
//!
//! Each record is one label byte followed by 3072 pixel bytes: three
//! channel planes (red, green, blue) of 32x32 row-major pixels. The test
//! split is a single `test_batch.bin` of 10000 records.

use std::path::Path;

use crate::{CotejarError, Result};

use super::transform::Normalize;

/// Image height in pixels
pub const IMAGE_HEIGHT: usize = 32;
/// Image width in pixels
pub const IMAGE_WIDTH: usize = 32;
/// Color channels per image
pub const IMAGE_CHANNELS: usize = 3;
/// Pixel bytes per image
pub const PIXELS_PER_IMAGE: usize = IMAGE_CHANNELS * IMAGE_HEIGHT * IMAGE_WIDTH;
/// Bytes per record (label + pixels)
pub const RECORD_LEN: usize = 1 + PIXELS_PER_IMAGE;

/// File holding the test split inside the extracted archive
pub const TEST_BATCH_FILE: &str = "test_batch.bin";
/// Directory the upstream archive extracts to
pub const BATCHES_DIR: &str = "cifar-10-batches-bin";

/// The ten CIFAR-10 classes, indexed by label byte
pub const CLASS_NAMES: [&str; 10] = [
    "airplane",
    "automobile",
    "bird",
    "cat",
    "deer",
    "dog",
    "frog",
    "horse",
    "ship",
    "truck",
];

/// In-memory dataset of normalized images and labels.
pub struct CifarDataset {
    images: Vec<f32>,
    labels: Vec<u8>,
}

impl CifarDataset {
    /// Parse raw record bytes, normalizing pixels as they are decoded.
    pub fn from_records(bytes: &[u8], normalize: &Normalize, origin: &Path) -> Result<Self> {
        if bytes.len() % RECORD_LEN != 0 {
            return Err(CotejarError::Dataset {
                path: origin.to_path_buf(),
                message: format!(
                    "file length {} is not a multiple of the {RECORD_LEN}-byte record size",
                    bytes.len()
                ),
            });
        }

        let count = bytes.len() / RECORD_LEN;
        let mut images = Vec::with_capacity(count * PIXELS_PER_IMAGE);
        let mut labels = Vec::with_capacity(count);

        for (i, record) in bytes.chunks_exact(RECORD_LEN).enumerate() {
            let label = record[0];
            if label >= CLASS_NAMES.len() as u8 {
                return Err(CotejarError::Dataset {
                    path: origin.to_path_buf(),
                    message: format!("record {i} has out-of-range label {label}"),
                });
            }
            labels.push(label);
            images.extend(normalize.apply(&record[1..]));
        }

        Ok(Self { images, labels })
    }

    /// Load the test split from an extracted dataset directory.
    ///
    /// Accepts either the directory containing `test_batch.bin` or its
    /// parent (the archive extraction root).
    pub fn load_test_split(dir: &Path, normalize: &Normalize) -> Result<Self> {
        let direct = dir.join(TEST_BATCH_FILE);
        let nested = dir.join(BATCHES_DIR).join(TEST_BATCH_FILE);
        let path = if direct.exists() { direct } else { nested };

        let bytes = std::fs::read(&path)
            .map_err(|e| CotejarError::io(format!("reading {}", path.display()), e))?;
        Self::from_records(&bytes, normalize, &path)
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the dataset holds no samples.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Normalized pixels of one sample, channel-planar.
    pub fn image(&self, idx: usize) -> &[f32] {
        &self.images[idx * PIXELS_PER_IMAGE..][..PIXELS_PER_IMAGE]
    }

    /// Label byte of one sample.
    pub fn label(&self, idx: usize) -> u8 {
        self.labels[idx]
    }

    /// All labels.
    pub fn labels(&self) -> &[u8] {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(label: u8, fill: u8) -> Vec<u8> {
        let mut rec = vec![label];
        rec.extend(vec![fill; PIXELS_PER_IMAGE]);
        rec
    }

    #[test]
    fn test_parse_single_record() {
        let bytes = record(3, 128);
        let ds = CifarDataset::from_records(&bytes, &Normalize::cifar10(), &PathBuf::from("t"))
            .expect("parse should succeed");
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.label(0), 3);
        assert_eq!(ds.image(0).len(), PIXELS_PER_IMAGE);
    }

    #[test]
    fn test_parse_multiple_records() {
        let mut bytes = record(0, 0);
        bytes.extend(record(9, 255));
        let ds = CifarDataset::from_records(&bytes, &Normalize::cifar10(), &PathBuf::from("t"))
            .expect("parse should succeed");
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.labels(), &[0, 9]);
    }

    #[test]
    fn test_rejects_truncated_file() {
        let bytes = vec![0u8; RECORD_LEN - 1];
        let result =
            CifarDataset::from_records(&bytes, &Normalize::cifar10(), &PathBuf::from("t"));
        assert!(result.is_err());
    }

    #[test]
    fn test_rejects_out_of_range_label() {
        let bytes = record(10, 0);
        let result =
            CifarDataset::from_records(&bytes, &Normalize::cifar10(), &PathBuf::from("t"));
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_file_parses_to_empty_dataset() {
        let ds = CifarDataset::from_records(&[], &Normalize::cifar10(), &PathBuf::from("t"))
            .expect("parse should succeed");
        assert!(ds.is_empty());
    }

    #[test]
    fn test_class_names_cover_all_labels() {
        assert_eq!(CLASS_NAMES.len(), 10);
        assert_eq!(CLASS_NAMES[0], "airplane");
        assert_eq!(CLASS_NAMES[9], "truck");
    }

    #[test]
    fn test_load_test_split_from_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(TEST_BATCH_FILE), record(5, 64)).expect("write");
        let ds = CifarDataset::load_test_split(dir.path(), &Normalize::cifar10())
            .expect("load should succeed");
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.label(0), 5);
    }

    #[test]
    fn test_load_test_split_from_extraction_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join(BATCHES_DIR);
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(nested.join(TEST_BATCH_FILE), record(1, 0)).expect("write");
        let ds = CifarDataset::load_test_split(dir.path(), &Normalize::cifar10())
            .expect("load should succeed");
        assert_eq!(ds.label(0), 1);
    }

    #[test]
    fn test_load_test_split_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = CifarDataset::load_test_split(dir.path(), &Normalize::cifar10());
        assert!(result.is_err());
    }
}
