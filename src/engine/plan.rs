//! Engine plan construction and execution.
//!
//! Compilation freezes one kernel per weighted layer. INT8 kernels hold
//! per-channel quantized weights plus the per-tensor scale of the layer's
//! input activations; execution quantizes the input, runs the integer
//! kernel, and folds the two scales and the f32 bias back in before the
//! activation and pooling stages.

use ndarray::Array2;
use std::collections::HashMap;

use crate::data::{Batch, DataLoader};
use crate::eval::Classifier;
use crate::model::{ConvLayer, DenseLayer, VggClassifier, VggConfig};
use crate::nn::{conv2d, conv2d_i8, linear, linear_i8, max_pool2d, relu, ConvDims, PoolDims};
use crate::{CotejarError, Result};

use super::observer::RangeObserver;
use super::quantize::{
    calibrate_per_channel, quantize_activations, quantize_with_params, QuantizedTensor,
};
use super::spec::{CompileSpec, Precision};

enum Kernel {
    Fp32 {
        weight: Vec<f32>,
    },
    Int8 {
        weight: QuantizedTensor,
        input_scale: f32,
    },
}

struct PlanConv {
    kernel: Kernel,
    bias: Vec<f32>,
    in_channels: usize,
    out_channels: usize,
}

struct PlanDense {
    kernel: Kernel,
    bias: Vec<f32>,
    in_features: usize,
    out_features: usize,
}

/// An executable engine built from a float model and a [`CompileSpec`].
pub struct CompiledModel {
    config: VggConfig,
    precision: Precision,
    max_batch_size: usize,
    blocks: Vec<Vec<PlanConv>>,
    classifier: Vec<PlanDense>,
}

/// Build an engine using the QAT ranges carried by the checkpoint.
///
/// Fails with [`CotejarError::MissingQuantRange`] if INT8 is requested and
/// any weighted layer lacks an `input_amax`; calibrate instead with
/// [`compile_with_calibration`].
pub fn compile(model: &VggClassifier, spec: &CompileSpec) -> Result<CompiledModel> {
    build(model, spec, None)
}

/// Build an engine, filling missing activation ranges by observing the
/// float model over up to `spec.calibration_batches` batches.
///
/// Checkpoint QAT ranges take precedence where present; observed ranges
/// cover the rest.
pub fn compile_with_calibration(
    model: &VggClassifier,
    spec: &CompileSpec,
    loader: &DataLoader,
) -> Result<CompiledModel> {
    let mut observers: HashMap<String, RangeObserver> = HashMap::new();
    for batch in loader.iter().take(spec.calibration_batches) {
        model.forward_observed(&batch, &mut observers)?;
    }
    let observed: HashMap<String, f32> = observers
        .into_iter()
        .filter_map(|(name, obs)| obs.amax().map(|amax| (name, amax)))
        .collect();
    build(model, spec, Some(&observed))
}

fn build(
    model: &VggClassifier,
    spec: &CompileSpec,
    observed: Option<&HashMap<String, f32>>,
) -> Result<CompiledModel> {
    spec.validate()?;
    let input = spec.input()?;
    let config = &model.config;
    if input.channels != config.in_channels || (input.height, input.width) != config.input_hw {
        return Err(CotejarError::ConfigValue {
            field: "inputs".into(),
            message: format!(
                "engine input {}x{}x{} does not match the model input {}x{}x{}",
                input.channels,
                input.height,
                input.width,
                config.in_channels,
                config.input_hw.0,
                config.input_hw.1
            ),
            suggestion: "Use the model's input shape in the compile spec".into(),
        });
    }

    let precision = spec.target_precision();

    let blocks = model
        .blocks
        .iter()
        .map(|block| {
            block
                .iter()
                .map(|conv| plan_conv(conv, precision, observed))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    let classifier = model
        .classifier
        .iter()
        .map(|dense| plan_dense(dense, precision, observed))
        .collect::<Result<Vec<_>>>()?;

    Ok(CompiledModel {
        config: config.clone(),
        precision,
        max_batch_size: spec.max_batch_size,
        blocks,
        classifier,
    })
}

fn input_scale(
    name: &str,
    qat_amax: Option<f32>,
    observed: Option<&HashMap<String, f32>>,
) -> Result<f32> {
    let amax = qat_amax.or_else(|| observed.and_then(|m| m.get(name).copied()));
    match amax {
        Some(amax) if amax > 0.0 => Ok(amax / 127.0),
        Some(_) => Ok(1e-10),
        None => Err(CotejarError::MissingQuantRange { layer: name.into() }),
    }
}

fn plan_conv(
    conv: &ConvLayer,
    precision: Precision,
    observed: Option<&HashMap<String, f32>>,
) -> Result<PlanConv> {
    let kernel = match precision {
        Precision::Fp32 => Kernel::Fp32 {
            weight: conv.weight.clone(),
        },
        Precision::Int8 => {
            let params = calibrate_per_channel(&conv.weight, conv.out_channels, 8);
            let weight = QuantizedTensor {
                data: quantize_with_params(&conv.weight, &params),
                params,
                shape: vec![conv.out_channels, conv.in_channels, 3, 3],
            };
            Kernel::Int8 {
                weight,
                input_scale: input_scale(&conv.name, conv.input_amax, observed)?,
            }
        }
    };
    Ok(PlanConv {
        kernel,
        bias: conv.bias.clone(),
        in_channels: conv.in_channels,
        out_channels: conv.out_channels,
    })
}

fn plan_dense(
    dense: &DenseLayer,
    precision: Precision,
    observed: Option<&HashMap<String, f32>>,
) -> Result<PlanDense> {
    let kernel = match precision {
        Precision::Fp32 => Kernel::Fp32 {
            weight: dense.weight.clone(),
        },
        Precision::Int8 => {
            let params = calibrate_per_channel(&dense.weight, dense.out_features, 8);
            let weight = QuantizedTensor {
                data: quantize_with_params(&dense.weight, &params),
                params,
                shape: vec![dense.out_features, dense.in_features],
            };
            Kernel::Int8 {
                weight,
                input_scale: input_scale(&dense.name, dense.input_amax, observed)?,
            }
        }
    };
    Ok(PlanDense {
        kernel,
        bias: dense.bias.clone(),
        in_features: dense.in_features,
        out_features: dense.out_features,
    })
}

impl CompiledModel {
    /// The precision the engine executes in.
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Largest batch the engine accepts.
    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn run_conv(&self, conv: &PlanConv, x: &[f32], n: usize, hw: (usize, usize)) -> Result<Vec<f32>> {
        let dims = ConvDims::same_3x3(n, conv.in_channels, conv.out_channels, hw);
        match &conv.kernel {
            Kernel::Fp32 { weight } => conv2d(x, weight, Some(&conv.bias), dims),
            Kernel::Int8 {
                weight,
                input_scale,
            } => {
                let x_q = quantize_activations(x, *input_scale);
                let acc = conv2d_i8(&x_q, &weight.data, dims)?;
                let (oh, ow) = dims.output_hw();
                let plane = oh * ow;
                Ok(acc
                    .iter()
                    .enumerate()
                    .map(|(i, &a)| {
                        let oc = (i / plane) % conv.out_channels;
                        a as f32 * input_scale * weight.params.scales[oc] + conv.bias[oc]
                    })
                    .collect())
            }
        }
    }

    fn run_dense(&self, dense: &PlanDense, x: &[f32], n: usize) -> Result<Vec<f32>> {
        match &dense.kernel {
            Kernel::Fp32 { weight } => linear(
                x,
                weight,
                Some(&dense.bias),
                n,
                dense.in_features,
                dense.out_features,
            ),
            Kernel::Int8 {
                weight,
                input_scale,
            } => {
                let x_q = quantize_activations(x, *input_scale);
                let acc = linear_i8(&x_q, &weight.data, n, dense.in_features, dense.out_features)?;
                Ok(acc
                    .iter()
                    .enumerate()
                    .map(|(i, &a)| {
                        let oc = i % dense.out_features;
                        a as f32 * input_scale * weight.params.scales[oc] + dense.bias[oc]
                    })
                    .collect())
            }
        }
    }
}

impl Classifier for CompiledModel {
    fn forward_batch(&self, batch: &Batch) -> Result<Array2<f32>> {
        let n = batch.len();
        if n > self.max_batch_size {
            return Err(CotejarError::ConfigValue {
                field: "batch".into(),
                message: format!(
                    "batch of {n} exceeds the engine's max batch size {}",
                    self.max_batch_size
                ),
                suggestion: "Rebuild the engine with a larger max_batch_size".into(),
            });
        }

        let mut x = batch.image_slice().to_vec();
        let (mut h, mut w) = self.config.input_hw;
        let mut channels = self.config.in_channels;

        for block in &self.blocks {
            for conv in block {
                x = self.run_conv(conv, &x, n, (h, w))?;
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
            x = self.run_dense(dense, &x, n)?;
            if i < last {
                relu(&mut x);
            }
        }

        Ok(Array2::from_shape_vec((n, self.config.num_classes), x)
            .expect("logit length matches shape by construction"))
    }
}
