//! Compile specification for engine building.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::{CotejarError, Result};

/// Numeric precision an engine may execute in
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Precision {
    /// Full-precision float execution
    Fp32,
    /// Symmetric 8-bit integer execution
    Int8,
}

/// Fixed input shape the engine is built for (NCHW)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputShape {
    /// Batch size
    pub batch: usize,
    /// Channels
    pub channels: usize,
    /// Height
    pub height: usize,
    /// Width
    pub width: usize,
}

impl InputShape {
    /// Create an input shape from an NCHW tuple.
    pub fn new(batch: usize, channels: usize, height: usize, width: usize) -> Self {
        Self {
            batch,
            channels,
            height,
            width,
        }
    }
}

/// Settings for lowering a float model into an engine.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompileSpec {
    /// Engine input shapes (one per model input; classifiers have one)
    pub inputs: Vec<InputShape>,
    /// Precisions the engine may use
    pub enabled_precisions: BTreeSet<Precision>,
    /// Largest batch the engine accepts; defaults to the input batch size
    pub max_batch_size: usize,
    /// Batches to run when calibrating activation ranges without QAT data
    pub calibration_batches: usize,
}

impl CompileSpec {
    /// INT8 spec for a single fixed input shape.
    pub fn int8(input: InputShape) -> Self {
        Self {
            inputs: vec![input],
            enabled_precisions: BTreeSet::from([Precision::Int8]),
            max_batch_size: input.batch,
            calibration_batches: 10,
        }
    }

    /// FP32 pass-through spec for a single fixed input shape.
    pub fn fp32(input: InputShape) -> Self {
        Self {
            inputs: vec![input],
            enabled_precisions: BTreeSet::from([Precision::Fp32]),
            max_batch_size: input.batch,
            calibration_batches: 0,
        }
    }

    /// Override the calibration batch budget.
    #[must_use]
    pub fn with_calibration_batches(mut self, batches: usize) -> Self {
        self.calibration_batches = batches;
        self
    }

    /// The precision the engine will execute in: INT8 when enabled,
    /// otherwise FP32.
    pub fn target_precision(&self) -> Precision {
        if self.enabled_precisions.contains(&Precision::Int8) {
            Precision::Int8
        } else {
            Precision::Fp32
        }
    }

    /// Validate the spec before compilation.
    pub fn validate(&self) -> Result<()> {
        let input = self.input()?;
        if input.batch == 0 || input.channels == 0 || input.height == 0 || input.width == 0 {
            return Err(CotejarError::ConfigValue {
                field: "inputs".into(),
                message: "input dimensions must be non-zero".into(),
                suggestion: "Use the dataset shape, e.g. 16x3x32x32 for CIFAR-10 batches".into(),
            });
        }
        if self.enabled_precisions.is_empty() {
            return Err(CotejarError::ConfigValue {
                field: "enabled_precisions".into(),
                message: "at least one precision must be enabled".into(),
                suggestion: "Enable Int8, Fp32, or both".into(),
            });
        }
        if self.max_batch_size < input.batch {
            return Err(CotejarError::ConfigValue {
                field: "max_batch_size".into(),
                message: format!(
                    "max batch {} is smaller than the input batch {}",
                    self.max_batch_size, input.batch
                ),
                suggestion: "Raise max_batch_size or shrink the input shape".into(),
            });
        }
        Ok(())
    }

    /// The single engine input. Classifier engines take exactly one.
    pub fn input(&self) -> Result<InputShape> {
        match self.inputs.as_slice() {
            [input] => Ok(*input),
            other => Err(CotejarError::ConfigValue {
                field: "inputs".into(),
                message: format!("expected exactly one input shape, got {}", other.len()),
                suggestion: "Classifier engines take a single NCHW input".into(),
            }),
        }
    }
}
