//! FP32 reference classifier.

use ndarray::Array2;
use std::collections::HashMap;

use crate::data::Batch;
use crate::engine::RangeObserver;
use crate::eval::Classifier;
use crate::nn::{conv2d, linear, max_pool2d, relu, ConvDims, PoolDims};
use crate::{CotejarError, Result};

use super::config::VggConfig;
use super::weights::Checkpoint;

/// A loaded convolution layer.
#[derive(Clone, Debug)]
pub struct ConvLayer {
    /// Checkpoint name prefix
    pub name: String,
    /// OIHW weights, flattened
    pub weight: Vec<f32>,
    /// Per-channel bias
    pub bias: Vec<f32>,
    /// Input channels
    pub in_channels: usize,
    /// Output channels
    pub out_channels: usize,
    /// QAT range of this layer's input activations, when present
    pub input_amax: Option<f32>,
}

/// A loaded dense layer.
#[derive(Clone, Debug)]
pub struct DenseLayer {
    /// Checkpoint name prefix
    pub name: String,
    /// (out, in) weights, flattened
    pub weight: Vec<f32>,
    /// Bias
    pub bias: Vec<f32>,
    /// Input features
    pub in_features: usize,
    /// Output features
    pub out_features: usize,
    /// QAT range of this layer's input activations, when present
    pub input_amax: Option<f32>,
}

/// VGG-style classifier with loaded weights, executing the float kernels.
pub struct VggClassifier {
    /// Architecture
    pub config: VggConfig,
    /// Convolution layers grouped by block; a halving pool follows each block
    pub blocks: Vec<Vec<ConvLayer>>,
    /// Dense head; ReLU between layers, none after the last
    pub classifier: Vec<DenseLayer>,
}

impl VggClassifier {
    /// Build the classifier from a checkpoint, validating every shape.
    pub fn from_checkpoint(config: VggConfig, checkpoint: &Checkpoint) -> Result<Self> {
        config.validate()?;

        let mut blocks = Vec::with_capacity(config.blocks.len());
        for block_specs in config.conv_specs() {
            let mut block = Vec::with_capacity(block_specs.len());
            for spec in block_specs {
                let weight = checkpoint.tensor(&format!("{}.weight", spec.name))?;
                let expected = vec![spec.out_channels, spec.in_channels, 3, 3];
                if weight.shape != expected {
                    return Err(CotejarError::ShapeMismatch {
                        tensor: format!("{}.weight", spec.name),
                        expected,
                        actual: weight.shape.clone(),
                    });
                }
                let bias = checkpoint.tensor(&format!("{}.bias", spec.name))?;
                if bias.shape != vec![spec.out_channels] {
                    return Err(CotejarError::ShapeMismatch {
                        tensor: format!("{}.bias", spec.name),
                        expected: vec![spec.out_channels],
                        actual: bias.shape.clone(),
                    });
                }
                block.push(ConvLayer {
                    input_amax: checkpoint.input_amax(&spec.name),
                    weight: weight.data.clone(),
                    bias: bias.data.clone(),
                    in_channels: spec.in_channels,
                    out_channels: spec.out_channels,
                    name: spec.name,
                });
            }
            blocks.push(block);
        }

        let mut classifier = Vec::new();
        for spec in config.dense_specs() {
            let weight = checkpoint.tensor(&format!("{}.weight", spec.name))?;
            let expected = vec![spec.out_features, spec.in_features];
            if weight.shape != expected {
                return Err(CotejarError::ShapeMismatch {
                    tensor: format!("{}.weight", spec.name),
                    expected,
                    actual: weight.shape.clone(),
                });
            }
            let bias = checkpoint.tensor(&format!("{}.bias", spec.name))?;
            if bias.shape != vec![spec.out_features] {
                return Err(CotejarError::ShapeMismatch {
                    tensor: format!("{}.bias", spec.name),
                    expected: vec![spec.out_features],
                    actual: bias.shape.clone(),
                });
            }
            classifier.push(DenseLayer {
                input_amax: checkpoint.input_amax(&spec.name),
                weight: weight.data.clone(),
                bias: bias.data.clone(),
                in_features: spec.in_features,
                out_features: spec.out_features,
                name: spec.name,
            });
        }

        Ok(Self {
            config,
            blocks,
            classifier,
        })
    }

    /// Total loaded parameter count.
    pub fn num_parameters(&self) -> usize {
        self.config.num_parameters()
    }

    /// Whether every weighted layer carries a QAT input range.
    pub fn has_quant_ranges(&self) -> bool {
        self.blocks
            .iter()
            .flatten()
            .all(|c| c.input_amax.is_some())
            && self.classifier.iter().all(|d| d.input_amax.is_some())
    }

    /// Forward pass that records every weighted layer's input range.
    ///
    /// Used by the engine's calibration fallback; the logits are identical
    /// to [`Classifier::forward_batch`].
    pub fn forward_observed(
        &self,
        batch: &Batch,
        observers: &mut HashMap<String, RangeObserver>,
    ) -> Result<Array2<f32>> {
        self.forward_impl(batch, Some(observers))
    }

    fn forward_impl(
        &self,
        batch: &Batch,
        mut observers: Option<&mut HashMap<String, RangeObserver>>,
    ) -> Result<Array2<f32>> {
        let n = batch.len();
        let mut x = batch.image_slice().to_vec();
        let (mut h, mut w) = self.config.input_hw;
        let mut channels = self.config.in_channels;

        for block in &self.blocks {
            for conv in block {
                if let Some(obs) = observers.as_deref_mut() {
                    obs.entry(conv.name.clone())
                        .or_insert_with(RangeObserver::min_max)
                        .observe(&x);
                }
                let dims = ConvDims::same_3x3(n, conv.in_channels, conv.out_channels, (h, w));
                x = conv2d(&x, &conv.weight, Some(&conv.bias), dims)?;
                relu(&mut x);
                channels = conv.out_channels;
            }
            let pool = PoolDims::halving(n, channels, (h, w));
            x = max_pool2d(&x, pool)?;
            let (ph, pw) = pool.output_hw();
            h = ph;
            w = pw;
        }

        let last = self.classifier.len().saturating_sub(1);
        for (i, dense) in self.classifier.iter().enumerate() {
            if let Some(obs) = observers.as_deref_mut() {
                obs.entry(dense.name.clone())
                    .or_insert_with(RangeObserver::min_max)
                    .observe(&x);
            }
            x = linear(
                &x,
                &dense.weight,
                Some(&dense.bias),
                n,
                dense.in_features,
                dense.out_features,
            )?;
            if i < last {
                relu(&mut x);
            }
        }

        Ok(Array2::from_shape_vec((n, self.config.num_classes), x)
            .expect("logit length matches shape by construction"))
    }
}

impl Classifier for VggClassifier {
    fn forward_batch(&self, batch: &Batch) -> Result<Array2<f32>> {
        self.forward_impl(batch, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TensorData;

    #[test]
    fn test_from_checkpoint_tiny() {
        let config = VggConfig::tiny();
        let ckpt = Checkpoint::mock(&config, true);
        let model = VggClassifier::from_checkpoint(config, &ckpt).expect("build should succeed");
        assert_eq!(model.blocks.len(), 2);
        assert_eq!(model.classifier.len(), 2);
        assert!(model.has_quant_ranges());
    }

    #[test]
    fn test_from_checkpoint_without_ranges() {
        let config = VggConfig::tiny();
        let ckpt = Checkpoint::mock(&config, false);
        let model = VggClassifier::from_checkpoint(config, &ckpt).expect("build should succeed");
        assert!(!model.has_quant_ranges());
    }

    #[test]
    fn test_from_checkpoint_missing_tensor() {
        let config = VggConfig::tiny();
        let mut tensors = Checkpoint::mock(&config, true).into_tensors();
        tensors.remove("classifier.0.weight");
        let ckpt = Checkpoint::from_tensors(tensors);
        let result = VggClassifier::from_checkpoint(config, &ckpt);
        assert!(matches!(result, Err(CotejarError::MissingTensor { .. })));
    }

    #[test]
    fn test_from_checkpoint_rejects_wrong_shape() {
        let config = VggConfig::tiny();
        let mut tensors = Checkpoint::mock(&config, true).into_tensors();
        tensors.insert(
            "features.0.weight".to_string(),
            TensorData::new(vec![0.0; 42], vec![42]),
        );
        let ckpt = Checkpoint::from_tensors(tensors);
        let result = VggClassifier::from_checkpoint(config, &ckpt);
        assert!(matches!(result, Err(CotejarError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_forward_batch_logit_shape() {
        let config = VggConfig::tiny();
        let num_classes = config.num_classes;
        let ckpt = Checkpoint::mock(&config, true);
        let model = VggClassifier::from_checkpoint(config, &ckpt).expect("build should succeed");

        let batch = Batch::mock(3, 7);
        let logits = model.forward_batch(&batch).expect("forward should succeed");
        assert_eq!(logits.shape(), &[3, num_classes]);
        assert!(logits.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_forward_is_deterministic() {
        let config = VggConfig::tiny();
        let ckpt = Checkpoint::mock(&config, true);
        let model = VggClassifier::from_checkpoint(config, &ckpt).expect("build should succeed");

        let batch = Batch::mock(2, 3);
        let a = model.forward_batch(&batch).expect("forward should succeed");
        let b = model.forward_batch(&batch).expect("forward should succeed");
        assert_eq!(a, b);
    }

    #[test]
    fn test_forward_observed_records_every_weighted_layer() {
        let config = VggConfig::tiny();
        let ckpt = Checkpoint::mock(&config, false);
        let model = VggClassifier::from_checkpoint(config, &ckpt).expect("build should succeed");

        let batch = Batch::mock(2, 1);
        let mut observers = HashMap::new();
        let observed = model
            .forward_observed(&batch, &mut observers)
            .expect("forward should succeed");
        let plain = model.forward_batch(&batch).expect("forward should succeed");

        assert_eq!(observed, plain);
        // 2 convs + 2 dense layers
        assert_eq!(observers.len(), 4);
        assert!(observers.values().all(RangeObserver::has_data));
    }
}
