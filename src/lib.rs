//! cotejar: accuracy-regression harness for INT8-compiled classifiers.
//!
//! Loads a quantization-aware-trained image classifier from a SafeTensors
//! checkpoint, evaluates it on the CIFAR-10 test split, compiles it into a
//! symmetric INT8 engine, evaluates the engine on the same batches, and
//! checks that the accuracy delta stays inside a fixed tolerance.
//!
//! # Example
//!
//! ```no_run
//! use cotejar::data::{CifarDataset, DataLoader, DatasetFetcher, Normalize};
//! use cotejar::engine::{compile, CompileSpec, InputShape};
//! use cotejar::eval::{compute_accuracy, RegressionCheck};
//! use cotejar::model::{Checkpoint, VggClassifier, VggConfig};
//!
//! # fn main() -> cotejar::Result<()> {
//! let data_dir = DatasetFetcher::new().fetch()?;
//! let dataset = CifarDataset::load_test_split(&data_dir, &Normalize::cifar10())?;
//! let loader = DataLoader::new(dataset, 16)?;
//!
//! let checkpoint = Checkpoint::load("trained_vgg16_qat.safetensors")?;
//! let model = VggClassifier::from_checkpoint(VggConfig::vgg16(), &checkpoint)?;
//!
//! let baseline = compute_accuracy(&loader, &model)?;
//! let engine = compile(&model, &CompileSpec::int8(InputShape::new(16, 3, 32, 32)))?;
//! let compiled = compute_accuracy(&loader, &engine)?;
//!
//! let report = RegressionCheck::default().compare(baseline, compiled);
//! report.ensure_within_tolerance()?;
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod data;
pub mod engine;
mod error;
pub mod eval;
pub mod model;
pub mod nn;

pub use error::{CotejarError, Result};
