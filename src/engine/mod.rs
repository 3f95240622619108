//! INT8 engine building and execution.
//!
//! `compile` lowers a float classifier into an execution plan: weights are
//! quantized per output channel, activation scales come from QAT observer
//! ranges in the checkpoint (or from a calibration pass when the checkpoint
//! carries none), and execution runs the integer kernels with f32 rescaling
//! between layers.

mod observer;
mod plan;
mod quantize;
mod spec;

pub use observer::{ObserverMethod, RangeObserver};
pub use plan::{compile, compile_with_calibration, CompiledModel};
pub use quantize::{
    calibrate_per_channel, calibrate_per_tensor, dequantize_with_params, quantize_activations,
    quantize_with_params, QuantGranularity, QuantParams, QuantizedTensor,
};
pub use spec::{CompileSpec, InputShape, Precision};
