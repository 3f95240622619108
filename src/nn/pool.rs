//! Max pooling.

use crate::{CotejarError, Result};

/// Dimensions for a 2D max pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolDims {
    /// Batch size
    pub batch: usize,
    /// Channels
    pub channels: usize,
    /// Input height
    pub height: usize,
    /// Input width
    pub width: usize,
    /// Square window size
    pub kernel: usize,
    /// Stride
    pub stride: usize,
}

impl PoolDims {
    /// The 2x2 stride-2 window used between VGG blocks.
    pub fn halving(batch: usize, channels: usize, hw: (usize, usize)) -> Self {
        Self {
            batch,
            channels,
            height: hw.0,
            width: hw.1,
            kernel: 2,
            stride: 2,
        }
    }

    /// Output spatial size.
    pub fn output_hw(&self) -> (usize, usize) {
        (
            (self.height - self.kernel) / self.stride + 1,
            (self.width - self.kernel) / self.stride + 1,
        )
    }

    /// Expected input slice length.
    pub fn input_len(&self) -> usize {
        self.batch * self.channels * self.height * self.width
    }
}

/// Max pooling over non-overlapping (or strided) square windows.
pub fn max_pool2d(input: &[f32], dims: PoolDims) -> Result<Vec<f32>> {
    if dims.kernel == 0 || dims.stride == 0 || dims.kernel > dims.height || dims.kernel > dims.width
    {
        return Err(CotejarError::ConfigValue {
            field: "pool dims".into(),
            message: format!(
                "window {}x{} does not fit a {}x{} input",
                dims.kernel, dims.kernel, dims.height, dims.width
            ),
            suggestion: "Use a 2x2 stride-2 window for VGG-style feature maps".into(),
        });
    }
    if input.len() != dims.input_len() {
        return Err(CotejarError::ShapeMismatch {
            tensor: "pool input".into(),
            expected: vec![dims.batch, dims.channels, dims.height, dims.width],
            actual: vec![input.len()],
        });
    }

    let (oh, ow) = dims.output_hw();
    let mut output = vec![0.0f32; dims.batch * dims.channels * oh * ow];
    let in_plane = dims.height * dims.width;

    for n in 0..dims.batch {
        for c in 0..dims.channels {
            let plane = &input[(n * dims.channels + c) * in_plane..][..in_plane];
            for y in 0..oh {
                for x in 0..ow {
                    let mut best = f32::NEG_INFINITY;
                    for ky in 0..dims.kernel {
                        for kx in 0..dims.kernel {
                            let v = plane[(y * dims.stride + ky) * dims.width + x * dims.stride + kx];
                            if v > best {
                                best = v;
                            }
                        }
                    }
                    output[(n * dims.channels + c) * oh * ow + y * ow + x] = best;
                }
            }
        }
    }

    Ok(output)
}
