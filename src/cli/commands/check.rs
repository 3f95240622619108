//! Check command implementation: the end-to-end accuracy-regression run.

use std::path::Path;

use crate::cli::args::{CheckArgs, OutputFormat};
use crate::cli::logging::{log, LogLevel};
use crate::data::{resolve_data_dir, CifarDataset, DataLoader, Normalize};
use crate::engine::{compile, compile_with_calibration, CompileSpec, InputShape};
use crate::eval::{compute_accuracy, RegressionCheck};
use crate::model::{Checkpoint, VggClassifier, VggConfig};
use crate::{CotejarError, Result};

/// Read an architecture config from JSON, defaulting to the VGG16 layout.
fn load_arch(path: Option<&Path>) -> Result<VggConfig> {
    let Some(path) = path else {
        return Ok(VggConfig::vgg16());
    };
    let content = std::fs::read_to_string(path)
        .map_err(|e| CotejarError::io(format!("reading {}", path.display()), e))?;
    let config: VggConfig =
        serde_json::from_str(&content).map_err(|e| CotejarError::ConfigValue {
            field: "arch".into(),
            message: format!("invalid architecture config: {e}"),
            suggestion: "See VggConfig for the expected JSON fields".into(),
        })?;
    config.validate()?;
    Ok(config)
}

pub fn run_check(args: CheckArgs, level: LogLevel) -> Result<()> {
    let config = load_arch(args.arch.as_deref())?;

    let data_dir = resolve_data_dir(args.data_dir.as_deref())?;
    let dataset = CifarDataset::load_test_split(&data_dir, &Normalize::cifar10())?;
    log(
        level,
        LogLevel::Verbose,
        &format!("  Test split: {} samples from {}", dataset.len(), data_dir.display()),
    );

    let loader = DataLoader::new(dataset, args.batch_size)?.with_max_batches(args.max_batches);

    let checkpoint = Checkpoint::load(&args.model)?;
    let model = VggClassifier::from_checkpoint(config, &checkpoint)?;
    log(
        level,
        LogLevel::Verbose,
        &format!(
            "  Model: {} parameters, QAT ranges {}",
            model.num_parameters(),
            if model.has_quant_ranges() { "present" } else { "absent" }
        ),
    );

    let baseline = compute_accuracy(&loader, &model)?;
    log(
        level,
        LogLevel::Normal,
        &format!("[FP32] Test accuracy: {:.2}%", baseline.percent()),
    );

    let input = InputShape::new(
        args.batch_size,
        model.config.in_channels,
        model.config.input_hw.0,
        model.config.input_hw.1,
    );
    let spec = CompileSpec::int8(input).with_calibration_batches(args.calibration_batches);

    let engine = if model.has_quant_ranges() {
        compile(&model, &spec)?
    } else {
        log(
            level,
            LogLevel::Normal,
            &format!(
                "Checkpoint carries no QAT ranges; calibrating over {} batches",
                args.calibration_batches
            ),
        );
        compile_with_calibration(&model, &spec, &loader)?
    };

    let compiled = compute_accuracy(&loader, &engine)?;
    log(
        level,
        LogLevel::Normal,
        &format!("[INT8] Test accuracy: {:.2}%", compiled.percent()),
    );

    let report = RegressionCheck::new(args.tolerance).compare(baseline, compiled);
    match args.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report).map_err(|e| {
                CotejarError::ConfigValue {
                    field: "format".into(),
                    message: format!("report serialization failed: {e}"),
                    suggestion: "Use --format text".into(),
                }
            })?;
            println!("{json}");
        }
        OutputFormat::Text => {
            log(
                level,
                LogLevel::Normal,
                &format!(
                    "Delta: {:.2} points (tolerance {:.2})",
                    report.delta_pct(),
                    report.tolerance_pct
                ),
            );
        }
    }

    report.ensure_within_tolerance()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_arch_defaults_to_vgg16() {
        let config = load_arch(None).expect("default arch");
        assert_eq!(config, VggConfig::vgg16());
    }

    #[test]
    fn test_load_arch_from_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("arch.json");
        let json = serde_json::to_string(&VggConfig::tiny()).expect("serialize");
        std::fs::write(&path, json).expect("write");

        let config = load_arch(Some(&path)).expect("load arch");
        assert_eq!(config, VggConfig::tiny());
    }

    #[test]
    fn test_load_arch_rejects_invalid_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("arch.json");
        std::fs::write(&path, "{ not json }").expect("write");
        assert!(load_arch(Some(&path)).is_err());
    }

    #[test]
    fn test_load_arch_rejects_invalid_config() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("arch.json");
        let mut config = VggConfig::tiny();
        config.blocks.clear();
        std::fs::write(&path, serde_json::to_string(&config).expect("serialize")).expect("write");
        assert!(load_arch(Some(&path)).is_err());
    }
}
