//! Classifier architecture, checkpoint loading, and the FP32 reference model.

mod config;
mod vgg;
mod weights;

pub use config::{ConvSpec, DenseSpec, VggConfig};
pub use vgg::{ConvLayer, DenseLayer, VggClassifier};
pub use weights::{Checkpoint, TensorData};
