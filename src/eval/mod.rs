//! Accuracy evaluation and the compiled-vs-baseline regression check.

mod accuracy;
mod regression;

pub use accuracy::{compute_accuracy, Accuracy};
pub use regression::{RegressionCheck, RegressionReport, DEFAULT_TOLERANCE_PCT};

use ndarray::Array2;

use crate::data::Batch;
use crate::Result;

/// Anything that maps an image batch to per-class logits.
///
/// Both the FP32 reference model and the compiled engine implement this,
/// so the evaluation loop is identical for the two passes.
pub trait Classifier {
    /// Compute logits, shape `[batch, num_classes]`.
    fn forward_batch(&self, batch: &Batch) -> Result<Array2<f32>>;
}
