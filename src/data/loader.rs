//! Deterministic sequential batching.
//!
//! The evaluation protocol runs the test split in file order with a fixed
//! batch size and no shuffling, so both evaluation passes see identical
//! batches.

use ndarray::Array4;

use crate::{CotejarError, Result};

use super::cifar::{CifarDataset, IMAGE_CHANNELS, IMAGE_HEIGHT, IMAGE_WIDTH, PIXELS_PER_IMAGE};

/// One batch of normalized images (NCHW) with their labels.
pub struct Batch {
    /// Image block, shape `[batch, channels, height, width]`
    pub images: Array4<f32>,
    /// Label bytes, one per image
    pub labels: Vec<u8>,
}

impl Batch {
    /// Number of samples in the batch.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether the batch holds no samples.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The image block as a flat NCHW slice.
    pub fn image_slice(&self) -> &[f32] {
        self.images
            .as_slice()
            .expect("batch images are stored in standard layout")
    }

    /// Deterministic synthetic batch in the normalized value range
    /// (tests, demos). Labels cycle through the ten classes.
    pub fn mock(count: usize, seed: u32) -> Self {
        let total = count * PIXELS_PER_IMAGE;
        let flat: Vec<f32> = (0..total)
            .map(|i| ((i as f32 + seed as f32) * 0.113).sin() * 2.5)
            .collect();
        let images =
            Array4::from_shape_vec((count, IMAGE_CHANNELS, IMAGE_HEIGHT, IMAGE_WIDTH), flat)
                .expect("batch length matches shape by construction");
        let labels = (0..count).map(|i| (i % 10) as u8).collect();
        Self { images, labels }
    }
}

/// Sequential batcher over a [`CifarDataset`].
pub struct DataLoader {
    dataset: CifarDataset,
    batch_size: usize,
    max_batches: Option<usize>,
}

impl DataLoader {
    /// Create a loader with the given batch size.
    pub fn new(dataset: CifarDataset, batch_size: usize) -> Result<Self> {
        if batch_size == 0 {
            return Err(CotejarError::ConfigValue {
                field: "batch_size".into(),
                message: "batch size must be non-zero".into(),
                suggestion: "The evaluation protocol uses 16".into(),
            });
        }
        Ok(Self {
            dataset,
            batch_size,
            max_batches: None,
        })
    }

    /// Cap the number of batches yielded per pass.
    #[must_use]
    pub fn with_max_batches(mut self, max_batches: Option<usize>) -> Self {
        self.max_batches = max_batches;
        self
    }

    /// Configured batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Number of batches one pass yields (the final one may be short).
    pub fn num_batches(&self) -> usize {
        let full = self.dataset.len().div_ceil(self.batch_size);
        match self.max_batches {
            Some(cap) => full.min(cap),
            None => full,
        }
    }

    /// Total samples one pass covers.
    pub fn num_samples(&self) -> usize {
        match self.max_batches {
            Some(cap) => self.dataset.len().min(cap * self.batch_size),
            None => self.dataset.len(),
        }
    }

    /// Iterate batches in dataset order.
    pub fn iter(&self) -> impl Iterator<Item = Batch> + '_ {
        (0..self.num_batches()).map(move |b| self.batch(b))
    }

    fn batch(&self, index: usize) -> Batch {
        let start = index * self.batch_size;
        let end = (start + self.batch_size).min(self.dataset.len());
        let count = end - start;

        let mut flat = Vec::with_capacity(count * PIXELS_PER_IMAGE);
        let mut labels = Vec::with_capacity(count);
        for i in start..end {
            flat.extend_from_slice(self.dataset.image(i));
            labels.push(self.dataset.label(i));
        }

        let images =
            Array4::from_shape_vec((count, IMAGE_CHANNELS, IMAGE_HEIGHT, IMAGE_WIDTH), flat)
                .expect("batch length matches shape by construction");
        Batch { images, labels }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Normalize;
    use std::path::PathBuf;

    fn dataset(n: usize) -> CifarDataset {
        let mut bytes = Vec::new();
        for i in 0..n {
            bytes.push((i % 10) as u8);
            bytes.extend(vec![i as u8; PIXELS_PER_IMAGE]);
        }
        CifarDataset::from_records(&bytes, &Normalize::cifar10(), &PathBuf::from("t"))
            .expect("parse should succeed")
    }

    #[test]
    fn test_full_batches() {
        let loader = DataLoader::new(dataset(32), 16).expect("loader");
        assert_eq!(loader.num_batches(), 2);
        let batches: Vec<Batch> = loader.iter().collect();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].len(), 16);
        assert_eq!(batches[0].images.shape(), &[16, 3, 32, 32]);
    }

    #[test]
    fn test_final_short_batch() {
        let loader = DataLoader::new(dataset(18), 16).expect("loader");
        let batches: Vec<Batch> = loader.iter().collect();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[1].len(), 2);
        assert_eq!(batches[1].images.shape(), &[2, 3, 32, 32]);
    }

    #[test]
    fn test_order_is_deterministic() {
        let loader = DataLoader::new(dataset(20), 4).expect("loader");
        let labels_a: Vec<u8> = loader.iter().flat_map(|b| b.labels.clone()).collect();
        let labels_b: Vec<u8> = loader.iter().flat_map(|b| b.labels.clone()).collect();
        assert_eq!(labels_a, labels_b);
        assert_eq!(labels_a[..4], [0, 1, 2, 3]);
    }

    #[test]
    fn test_max_batches_caps_pass() {
        let loader = DataLoader::new(dataset(64), 16)
            .expect("loader")
            .with_max_batches(Some(2));
        assert_eq!(loader.num_batches(), 2);
        assert_eq!(loader.num_samples(), 32);
        assert_eq!(loader.iter().count(), 2);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        assert!(DataLoader::new(dataset(4), 0).is_err());
    }

    #[test]
    fn test_empty_dataset_yields_no_batches() {
        let loader = DataLoader::new(dataset(0), 16).expect("loader");
        assert_eq!(loader.num_batches(), 0);
        assert_eq!(loader.iter().count(), 0);
    }
}
