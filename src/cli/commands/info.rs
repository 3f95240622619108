//! Info command implementation: checkpoint summary.

use crate::cli::args::{InfoArgs, OutputFormat};
use crate::cli::logging::{log, LogLevel};
use crate::model::Checkpoint;
use crate::{CotejarError, Result};

pub fn run_info(args: InfoArgs, level: LogLevel) -> Result<()> {
    let checkpoint = Checkpoint::load(&args.model)?;

    match args.format {
        OutputFormat::Json => {
            let names: Vec<serde_json::Value> = checkpoint
                .names()
                .into_iter()
                .map(|name| {
                    let shape = checkpoint.get(name).map(|t| t.shape.clone()).unwrap_or_default();
                    serde_json::json!({ "name": name, "shape": shape })
                })
                .collect();
            let summary = serde_json::json!({
                "path": args.model,
                "tensors": checkpoint.tensor_count(),
                "parameters": checkpoint.param_count(),
                "quant_ranges": checkpoint.quant_range_count(),
                "names": names,
            });
            let json = serde_json::to_string_pretty(&summary).map_err(|e| {
                CotejarError::ConfigValue {
                    field: "format".into(),
                    message: format!("summary serialization failed: {e}"),
                    suggestion: "Use --format text".into(),
                }
            })?;
            println!("{json}");
        }
        OutputFormat::Text => {
            log(
                level,
                LogLevel::Normal,
                &format!("Checkpoint: {}", args.model.display()),
            );
            log(
                level,
                LogLevel::Normal,
                &format!("  Tensors:     {}", checkpoint.tensor_count()),
            );
            log(
                level,
                LogLevel::Normal,
                &format!("  Parameters:  {}", checkpoint.param_count()),
            );
            log(
                level,
                LogLevel::Normal,
                &format!("  QAT ranges:  {}", checkpoint.quant_range_count()),
            );
            for name in checkpoint.names() {
                let shape = checkpoint.get(name).map(|t| t.shape.clone()).unwrap_or_default();
                log(level, LogLevel::Verbose, &format!("  {name}: {shape:?}"));
            }
        }
    }

    Ok(())
}
