//! Error types with actionable diagnostics.
//!
//! All errors include contextual information to help users resolve issues
//! without needing to consult external documentation.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cotejar operations.
pub type Result<T> = std::result::Result<T, CotejarError>;

/// Errors that can occur while checking a compiled model against its baseline.
#[derive(Error, Debug)]
pub enum CotejarError {
    /// Model checkpoint not found.
    #[error("Model checkpoint not found: {path}\n  → Check the path or export the checkpoint first")]
    ModelNotFound { path: PathBuf },

    /// Model checkpoint could not be parsed.
    #[error("Invalid checkpoint {path}:\n  {message}\n  → Only SafeTensors checkpoints with F32 tensors are supported")]
    Checkpoint { path: PathBuf, message: String },

    /// A tensor the architecture requires is missing from the checkpoint.
    #[error("Checkpoint is missing tensor '{name}'\n  → Verify the checkpoint matches the architecture config")]
    MissingTensor { name: String },

    /// A checkpoint tensor has the wrong shape for the configured architecture.
    #[error("Tensor shape mismatch for '{tensor}': expected {expected:?}, got {actual:?}\n  → Verify the checkpoint matches the architecture config")]
    ShapeMismatch {
        tensor: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// INT8 compilation needs an activation range the checkpoint does not carry.
    #[error("No quantization range for layer '{layer}'\n  → Use a QAT checkpoint, or calibrate with --calibration-batches")]
    MissingQuantRange { layer: String },

    /// Configuration value is invalid.
    #[error("Invalid configuration value for '{field}': {message}\n  → {suggestion}")]
    ConfigValue {
        field: String,
        message: String,
        suggestion: String,
    },

    /// Dataset archive download failed.
    #[error("Download failed for {url}:\n  {message}\n  → Check network connectivity, or pass --data-dir with a pre-downloaded copy")]
    Download { url: String, message: String },

    /// Downloaded archive digest does not match the pinned value.
    #[error("Corrupt archive at {path}: expected SHA256 {expected}, got {actual}")]
    CorruptArchive {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// Dataset file is malformed.
    #[error("Malformed dataset file {path}:\n  {message}")]
    Dataset { path: PathBuf, message: String },

    /// Evaluation ran over zero samples.
    #[error("Evaluation saw no samples\n  → Check the dataset directory and --max-batches")]
    EmptyEvaluation,

    /// IO error with context.
    #[error("IO error: {context}\n  Cause: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// The compiled model regressed past the configured tolerance.
    #[error("Accuracy regression: baseline {baseline_pct:.2}%, compiled {compiled_pct:.2}%, tolerance {tolerance_pct:.2} points")]
    AccuracyRegression {
        baseline_pct: f64,
        compiled_pct: f64,
        tolerance_pct: f64,
    },
}

impl CotejarError {
    /// Create an IO error with context.
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Check if this error is user-recoverable.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::ModelNotFound { .. }
                | Self::Checkpoint { .. }
                | Self::MissingQuantRange { .. }
                | Self::ConfigValue { .. }
                | Self::Download { .. }
        )
    }

    /// Get the error code for structured output.
    pub fn code(&self) -> &'static str {
        match self {
            Self::ModelNotFound { .. } => "E001",
            Self::Checkpoint { .. } => "E002",
            Self::MissingTensor { .. } => "E003",
            Self::ShapeMismatch { .. } => "E004",
            Self::MissingQuantRange { .. } => "E010",
            Self::ConfigValue { .. } => "E011",
            Self::Download { .. } => "E020",
            Self::CorruptArchive { .. } => "E021",
            Self::Dataset { .. } => "E022",
            Self::EmptyEvaluation => "E030",
            Self::Io { .. } => "E050",
            Self::AccuracyRegression { .. } => "E100",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_unique() {
        let errors = vec![
            CotejarError::ModelNotFound { path: "".into() },
            CotejarError::Checkpoint {
                path: "".into(),
                message: "".into(),
            },
            CotejarError::MissingTensor { name: "".into() },
            CotejarError::ShapeMismatch {
                tensor: "".into(),
                expected: vec![],
                actual: vec![],
            },
            CotejarError::MissingQuantRange { layer: "".into() },
            CotejarError::ConfigValue {
                field: "".into(),
                message: "".into(),
                suggestion: "".into(),
            },
            CotejarError::Download {
                url: "".into(),
                message: "".into(),
            },
            CotejarError::CorruptArchive {
                path: "".into(),
                expected: "".into(),
                actual: "".into(),
            },
            CotejarError::Dataset {
                path: "".into(),
                message: "".into(),
            },
            CotejarError::EmptyEvaluation,
            CotejarError::AccuracyRegression {
                baseline_pct: 0.0,
                compiled_pct: 0.0,
                tolerance_pct: 0.0,
            },
        ];

        let codes: Vec<_> = errors.iter().map(CotejarError::code).collect();
        let unique: std::collections::HashSet<_> = codes.iter().collect();
        assert_eq!(unique.len(), codes.len());
    }

    #[test]
    fn test_regression_error_reports_both_accuracies() {
        let err = CotejarError::AccuracyRegression {
            baseline_pct: 92.35,
            compiled_pct: 88.1,
            tolerance_pct: 3.0,
        };
        let msg = err.to_string();
        assert!(msg.contains("92.35"));
        assert!(msg.contains("88.10"));
        assert!(msg.contains("3.00"));
    }

    #[test]
    fn test_missing_quant_range_suggests_calibration() {
        let err = CotejarError::MissingQuantRange {
            layer: "features.3".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("features.3"));
        assert!(msg.contains("--calibration-batches"));
    }

    #[test]
    fn test_user_errors_are_recoverable() {
        assert!(CotejarError::ModelNotFound { path: "".into() }.is_user_error());
        assert!(!CotejarError::EmptyEvaluation.is_user_error());
    }

    #[test]
    fn test_io_error_constructor() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = CotejarError::io("reading test batch", io_err);
        assert!(matches!(err, CotejarError::Io { .. }));
        assert!(err.to_string().contains("reading test batch"));
    }

    #[test]
    fn test_all_error_codes_start_with_e() {
        let errors = vec![
            CotejarError::EmptyEvaluation,
            CotejarError::MissingTensor { name: "w".into() },
        ];
        for err in errors {
            assert!(err.code().starts_with('E'));
        }
    }
}
