//! Dense (fully connected) kernels.
//!
//! Weights use the (out_features, in_features) row-major layout, matching
//! the checkpoint convention.

use crate::{CotejarError, Result};

fn validate(
    input_len: usize,
    weight_len: usize,
    batch: usize,
    in_features: usize,
    out_features: usize,
) -> Result<()> {
    if input_len != batch * in_features {
        return Err(CotejarError::ShapeMismatch {
            tensor: "linear input".into(),
            expected: vec![batch, in_features],
            actual: vec![input_len],
        });
    }
    if weight_len != out_features * in_features {
        return Err(CotejarError::ShapeMismatch {
            tensor: "linear weight".into(),
            expected: vec![out_features, in_features],
            actual: vec![weight_len],
        });
    }
    Ok(())
}

/// Reference f32 dense layer: `output = input @ weight^T + bias`.
pub fn linear(
    input: &[f32],
    weight: &[f32],
    bias: Option<&[f32]>,
    batch: usize,
    in_features: usize,
    out_features: usize,
) -> Result<Vec<f32>> {
    validate(input.len(), weight.len(), batch, in_features, out_features)?;
    if let Some(b) = bias {
        if b.len() != out_features {
            return Err(CotejarError::ShapeMismatch {
                tensor: "linear bias".into(),
                expected: vec![out_features],
                actual: vec![b.len()],
            });
        }
    }

    let mut output = vec![0.0f32; batch * out_features];
    for n in 0..batch {
        let row = &input[n * in_features..][..in_features];
        for o in 0..out_features {
            let w_row = &weight[o * in_features..][..in_features];
            let mut acc = bias.map_or(0.0, |b| b[o]);
            for (x, w) in row.iter().zip(w_row.iter()) {
                acc += x * w;
            }
            output[n * out_features + o] = acc;
        }
    }

    Ok(output)
}

/// Integer dense layer: i8 input and weights, i32 accumulators, no bias.
pub fn linear_i8(
    input: &[i8],
    weight: &[i8],
    batch: usize,
    in_features: usize,
    out_features: usize,
) -> Result<Vec<i32>> {
    validate(input.len(), weight.len(), batch, in_features, out_features)?;

    let mut output = vec![0i32; batch * out_features];
    for n in 0..batch {
        let row = &input[n * in_features..][..in_features];
        for o in 0..out_features {
            let w_row = &weight[o * in_features..][..in_features];
            let mut acc = 0i32;
            for (&x, &w) in row.iter().zip(w_row.iter()) {
                acc += i32::from(x) * i32::from(w);
            }
            output[n * out_features + o] = acc;
        }
    }

    Ok(output)
}
