//! Top-1 accuracy over a data loader.

use ndarray::ArrayView1;
use serde::Serialize;

use super::Classifier;
use crate::data::DataLoader;
use crate::{CotejarError, Result};

/// Running correct/total counters.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct Accuracy {
    /// Correctly classified samples
    pub correct: usize,
    /// Samples seen
    pub total: usize,
}

impl Accuracy {
    /// Record one prediction.
    pub fn record(&mut self, is_correct: bool) {
        self.total += 1;
        if is_correct {
            self.correct += 1;
        }
    }

    /// Accuracy as a fraction in `[0, 1]`; zero when nothing was seen.
    pub fn value(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64
        }
    }

    /// Accuracy as a percentage.
    pub fn percent(&self) -> f64 {
        100.0 * self.value()
    }
}

// First index of the maximum, so ties resolve the same way on every run.
fn argmax(row: ArrayView1<'_, f32>) -> usize {
    let mut best = 0;
    for (i, &v) in row.iter().enumerate() {
        if v > row[best] {
            best = i;
        }
    }
    best
}

/// Run one full evaluation pass: argmax of the logits against the labels,
/// batch by batch, in dataset order.
pub fn compute_accuracy(loader: &DataLoader, model: &dyn Classifier) -> Result<Accuracy> {
    let mut accuracy = Accuracy::default();

    for batch in loader.iter() {
        let logits = model.forward_batch(&batch)?;
        for (row, &label) in logits.outer_iter().zip(batch.labels.iter()) {
            accuracy.record(argmax(row) == usize::from(label));
        }
    }

    if accuracy.total == 0 {
        return Err(CotejarError::EmptyEvaluation);
    }
    Ok(accuracy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{arr1, Array2};

    #[test]
    fn test_accuracy_counters() {
        let mut acc = Accuracy::default();
        acc.record(true);
        acc.record(false);
        acc.record(true);
        assert_eq!(acc.correct, 2);
        assert_eq!(acc.total, 3);
        assert_abs_diff_eq!(acc.value(), 2.0 / 3.0);
    }

    #[test]
    fn test_empty_accuracy_is_zero() {
        let acc = Accuracy::default();
        assert_abs_diff_eq!(acc.value(), 0.0);
        assert_abs_diff_eq!(acc.percent(), 0.0);
    }

    #[test]
    fn test_percent_scaling() {
        let acc = Accuracy {
            correct: 9234,
            total: 10000,
        };
        assert_abs_diff_eq!(acc.percent(), 92.34);
    }

    #[test]
    fn test_argmax_picks_largest() {
        assert_eq!(argmax(arr1(&[0.1f32, 0.9, 0.3]).view()), 1);
        assert_eq!(argmax(arr1(&[2.0f32, -1.0]).view()), 0);
    }

    #[test]
    fn test_argmax_ties_take_first() {
        assert_eq!(argmax(arr1(&[0.5f32, 0.5]).view()), 0);
    }

    struct FixedLogits {
        classes: usize,
        predicted: usize,
    }

    impl Classifier for FixedLogits {
        fn forward_batch(&self, batch: &crate::data::Batch) -> Result<Array2<f32>> {
            let mut logits = Array2::zeros((batch.len(), self.classes));
            for mut row in logits.outer_iter_mut() {
                row[self.predicted] = 1.0;
            }
            Ok(logits)
        }
    }

    fn loader(labels: &[u8]) -> DataLoader {
        use crate::data::{CifarDataset, Normalize};
        let mut bytes = Vec::new();
        for &label in labels {
            bytes.push(label);
            bytes.extend(vec![0u8; crate::data::PIXELS_PER_IMAGE]);
        }
        let ds =
            CifarDataset::from_records(&bytes, &Normalize::cifar10(), std::path::Path::new("t"))
                .expect("parse should succeed");
        DataLoader::new(ds, 2).expect("loader")
    }

    #[test]
    fn test_compute_accuracy_counts_matches() {
        // Model always predicts class 1; two of four labels are 1.
        let loader = loader(&[1, 0, 1, 2]);
        let model = FixedLogits {
            classes: 10,
            predicted: 1,
        };
        let acc = compute_accuracy(&loader, &model).expect("eval should succeed");
        assert_eq!(acc.total, 4);
        assert_eq!(acc.correct, 2);
    }

    #[test]
    fn test_compute_accuracy_empty_loader_errors() {
        let loader = loader(&[]);
        let model = FixedLogits {
            classes: 10,
            predicted: 0,
        };
        let result = compute_accuracy(&loader, &model);
        assert!(matches!(result, Err(CotejarError::EmptyEvaluation)));
    }
}
