//! Symmetric INT8 quantization primitives.
//!
//! Weights are quantized per output channel, activations per tensor. Both
//! use symmetric ranges (zero point 0), so the integer kernels need no
//! zero-point correction terms.

use serde::{Deserialize, Serialize};

/// Quantization granularity options
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum QuantGranularity {
    /// Single scale for the entire tensor
    #[default]
    PerTensor,
    /// Separate scale per output channel (axis 0 for weights)
    PerChannel,
}

/// Quantization parameters for a tensor
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuantParams {
    /// Scale factor(s)
    pub scales: Vec<f32>,
    /// Quantization granularity
    pub granularity: QuantGranularity,
    /// Bit width
    pub bits: u8,
}

impl QuantParams {
    /// Largest representable magnitude: `qmax * scale` for the given group.
    pub fn qmax(&self) -> i32 {
        (1 << (self.bits - 1)) - 1
    }
}

/// Quantized tensor with per-channel or per-tensor scales
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QuantizedTensor {
    /// Quantized integer data
    pub data: Vec<i8>,
    /// Quantization parameters
    pub params: QuantParams,
    /// Original shape
    pub shape: Vec<usize>,
}

impl QuantizedTensor {
    /// Memory usage in bytes
    pub fn memory_bytes(&self) -> usize {
        self.data.len() + self.params.scales.len() * 4
    }
}

fn scale_for(values: &[f32], qmax: f32) -> f32 {
    let max_abs = values.iter().fold(0.0f32, |m, &v| m.max(v.abs()));
    if max_abs < 1e-10 {
        1e-10
    } else {
        max_abs / qmax
    }
}

/// Compute a single symmetric scale for the whole tensor.
pub fn calibrate_per_tensor(values: &[f32], bits: u8) -> QuantParams {
    let qmax = ((1i32 << (bits - 1)) - 1) as f32;
    QuantParams {
        scales: vec![scale_for(values, qmax)],
        granularity: QuantGranularity::PerTensor,
        bits,
    }
}

/// Compute one symmetric scale per output channel.
///
/// `values` is laid out with the channel axis outermost; each channel owns
/// `values.len() / num_channels` consecutive elements.
pub fn calibrate_per_channel(values: &[f32], num_channels: usize, bits: u8) -> QuantParams {
    let qmax = ((1i32 << (bits - 1)) - 1) as f32;
    let channel_len = values.len() / num_channels.max(1);
    let scales = (0..num_channels)
        .map(|c| scale_for(&values[c * channel_len..][..channel_len], qmax))
        .collect();
    QuantParams {
        scales,
        granularity: QuantGranularity::PerChannel,
        bits,
    }
}

/// Quantize values using the given parameters.
pub fn quantize_with_params(values: &[f32], params: &QuantParams) -> Vec<i8> {
    let qmax = params.qmax() as f32;
    let group_len = match params.granularity {
        QuantGranularity::PerTensor => values.len(),
        QuantGranularity::PerChannel => values.len() / params.scales.len().max(1),
    };

    values
        .iter()
        .enumerate()
        .map(|(i, &v)| {
            let scale = params.scales.get(i / group_len.max(1)).copied().unwrap_or(1.0);
            (v / scale).round().clamp(-qmax, qmax) as i8
        })
        .collect()
}

/// Dequantize values using the given parameters.
pub fn dequantize_with_params(quantized: &[i8], params: &QuantParams) -> Vec<f32> {
    let group_len = match params.granularity {
        QuantGranularity::PerTensor => quantized.len(),
        QuantGranularity::PerChannel => quantized.len() / params.scales.len().max(1),
    };

    quantized
        .iter()
        .enumerate()
        .map(|(i, &q)| {
            let scale = params.scales.get(i / group_len.max(1)).copied().unwrap_or(1.0);
            f32::from(q) * scale
        })
        .collect()
}

/// Quantize an activation slice with a fixed per-tensor scale.
///
/// Activation scales come from QAT observers or calibration, not from the
/// slice itself, so saturation is expected for out-of-range values.
pub fn quantize_activations(values: &[f32], scale: f32) -> Vec<i8> {
    values
        .iter()
        .map(|&v| (v / scale).round().clamp(-127.0, 127.0) as i8)
        .collect()
}
