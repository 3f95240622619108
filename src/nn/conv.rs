//! 2D convolution kernels (NCHW input, OIHW weights).

use crate::{CotejarError, Result};

/// Dimensions for a 2D convolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConvDims {
    /// Batch size
    pub batch: usize,
    /// Input channels
    pub in_channels: usize,
    /// Output channels
    pub out_channels: usize,
    /// Input height
    pub height: usize,
    /// Input width
    pub width: usize,
    /// Square kernel size
    pub kernel: usize,
    /// Stride
    pub stride: usize,
    /// Zero padding on each side
    pub padding: usize,
}

impl ConvDims {
    /// 3x3 stride-1 pad-1 convolution (the shape-preserving VGG case).
    pub fn same_3x3(batch: usize, in_channels: usize, out_channels: usize, hw: (usize, usize)) -> Self {
        Self {
            batch,
            in_channels,
            out_channels,
            height: hw.0,
            width: hw.1,
            kernel: 3,
            stride: 1,
            padding: 1,
        }
    }

    /// Output spatial size.
    pub fn output_hw(&self) -> (usize, usize) {
        let oh = (self.height + 2 * self.padding - self.kernel) / self.stride + 1;
        let ow = (self.width + 2 * self.padding - self.kernel) / self.stride + 1;
        (oh, ow)
    }

    /// Expected input slice length.
    pub fn input_len(&self) -> usize {
        self.batch * self.in_channels * self.height * self.width
    }

    /// Expected weight slice length.
    pub fn weight_len(&self) -> usize {
        self.out_channels * self.in_channels * self.kernel * self.kernel
    }

    /// Output slice length.
    pub fn output_len(&self) -> usize {
        let (oh, ow) = self.output_hw();
        self.batch * self.out_channels * oh * ow
    }

    fn validate(&self, input_len: usize, weight_len: usize) -> Result<()> {
        if self.stride == 0
            || self.kernel == 0
            || self.kernel > self.height + 2 * self.padding
            || self.kernel > self.width + 2 * self.padding
        {
            return Err(CotejarError::ConfigValue {
                field: "conv dims".into(),
                message: format!(
                    "kernel {} with stride {} does not fit a {}x{} input",
                    self.kernel, self.stride, self.height, self.width
                ),
                suggestion: "Use kernel=3, stride=1, padding=1 for VGG-style convolutions".into(),
            });
        }
        if input_len != self.input_len() {
            return Err(CotejarError::ShapeMismatch {
                tensor: "conv input".into(),
                expected: vec![self.batch, self.in_channels, self.height, self.width],
                actual: vec![input_len],
            });
        }
        if weight_len != self.weight_len() {
            return Err(CotejarError::ShapeMismatch {
                tensor: "conv weight".into(),
                expected: vec![self.out_channels, self.in_channels, self.kernel, self.kernel],
                actual: vec![weight_len],
            });
        }
        Ok(())
    }
}

/// Reference f32 convolution with zero padding.
pub fn conv2d(
    input: &[f32],
    weight: &[f32],
    bias: Option<&[f32]>,
    dims: ConvDims,
) -> Result<Vec<f32>> {
    dims.validate(input.len(), weight.len())?;
    if let Some(b) = bias {
        if b.len() != dims.out_channels {
            return Err(CotejarError::ShapeMismatch {
                tensor: "conv bias".into(),
                expected: vec![dims.out_channels],
                actual: vec![b.len()],
            });
        }
    }

    let (oh, ow) = dims.output_hw();
    let mut output = vec![0.0f32; dims.output_len()];

    let in_plane = dims.height * dims.width;
    let in_image = dims.in_channels * in_plane;
    let k2 = dims.kernel * dims.kernel;
    let w_filter = dims.in_channels * k2;

    for n in 0..dims.batch {
        for oc in 0..dims.out_channels {
            let base = bias.map_or(0.0, |b| b[oc]);
            for y in 0..oh {
                for x in 0..ow {
                    let mut acc = base;
                    for ic in 0..dims.in_channels {
                        for ky in 0..dims.kernel {
                            let iy = y * dims.stride + ky;
                            if iy < dims.padding || iy >= dims.height + dims.padding {
                                continue;
                            }
                            let iy = iy - dims.padding;
                            for kx in 0..dims.kernel {
                                let ix = x * dims.stride + kx;
                                if ix < dims.padding || ix >= dims.width + dims.padding {
                                    continue;
                                }
                                let ix = ix - dims.padding;
                                let in_idx = n * in_image + ic * in_plane + iy * dims.width + ix;
                                let w_idx = oc * w_filter + ic * k2 + ky * dims.kernel + kx;
                                acc += input[in_idx] * weight[w_idx];
                            }
                        }
                    }
                    output[n * dims.out_channels * oh * ow + oc * oh * ow + y * ow + x] = acc;
                }
            }
        }
    }

    Ok(output)
}

/// Integer convolution: i8 input and weights, i32 accumulators, no bias.
///
/// Zero padding is exact in the quantized domain because both input and
/// weights are quantized symmetrically (zero point 0).
pub fn conv2d_i8(input: &[i8], weight: &[i8], dims: ConvDims) -> Result<Vec<i32>> {
    dims.validate(input.len(), weight.len())?;

    let (oh, ow) = dims.output_hw();
    let mut output = vec![0i32; dims.output_len()];

    let in_plane = dims.height * dims.width;
    let in_image = dims.in_channels * in_plane;
    let k2 = dims.kernel * dims.kernel;
    let w_filter = dims.in_channels * k2;

    for n in 0..dims.batch {
        for oc in 0..dims.out_channels {
            for y in 0..oh {
                for x in 0..ow {
                    let mut acc = 0i32;
                    for ic in 0..dims.in_channels {
                        for ky in 0..dims.kernel {
                            let iy = y * dims.stride + ky;
                            if iy < dims.padding || iy >= dims.height + dims.padding {
                                continue;
                            }
                            let iy = iy - dims.padding;
                            for kx in 0..dims.kernel {
                                let ix = x * dims.stride + kx;
                                if ix < dims.padding || ix >= dims.width + dims.padding {
                                    continue;
                                }
                                let ix = ix - dims.padding;
                                let in_idx = n * in_image + ic * in_plane + iy * dims.width + ix;
                                let w_idx = oc * w_filter + ic * k2 + ky * dims.kernel + kx;
                                acc += i32::from(input[in_idx]) * i32::from(weight[w_idx]);
                            }
                        }
                    }
                    output[n * dims.out_channels * oh * ow + oc * oh * ow + y * ow + x] = acc;
                }
            }
        }
    }

    Ok(output)
}
