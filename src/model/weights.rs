//! SafeTensors checkpoint reading and writing.
//!
//! Checkpoints hold named F32 tensors. QAT checkpoints additionally carry
//! one `{layer}.input_amax` scalar per weighted layer: the absolute
//! maximum the layer's input activations reached during quantization-aware
//! training.

use safetensors::tensor::{Dtype, TensorView};
use safetensors::SafeTensors;
use std::collections::HashMap;
use std::path::Path;

use crate::{CotejarError, Result};

/// Suffix marking a QAT activation-range scalar
pub const INPUT_AMAX_SUFFIX: &str = ".input_amax";

/// A named tensor's data and shape.
#[derive(Clone, Debug)]
pub struct TensorData {
    /// Flattened values
    pub data: Vec<f32>,
    /// Shape
    pub shape: Vec<usize>,
}

impl TensorData {
    /// Create from values and shape.
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Self {
        Self { data, shape }
    }

    /// Element count.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// An in-memory model checkpoint.
pub struct Checkpoint {
    tensors: HashMap<String, TensorData>,
}

impl Checkpoint {
    /// Build a checkpoint from named tensors.
    pub fn from_tensors(tensors: HashMap<String, TensorData>) -> Self {
        Self { tensors }
    }

    /// Deterministic synthetic checkpoint for a config (tests, demos).
    ///
    /// Weights follow a fixed sine pattern at Xavier scale; with
    /// `with_ranges` every weighted layer gets an `input_amax` scalar.
    pub fn mock(config: &crate::model::VggConfig, with_ranges: bool) -> Self {
        let mut tensors = HashMap::new();

        let mut insert_layer = |name: &str, out: usize, inner: usize, shape: Vec<usize>| {
            let scale = (2.0 / (out + inner) as f32).sqrt();
            let len: usize = shape.iter().product();
            let weight: Vec<f32> = (0..len).map(|i| (i as f32 * 0.567).sin() * scale).collect();
            let bias: Vec<f32> = (0..out).map(|i| (i % 7) as f32 * 0.01).collect();
            tensors.insert(format!("{name}.weight"), TensorData::new(weight, shape));
            tensors.insert(format!("{name}.bias"), TensorData::new(bias, vec![out]));
            if with_ranges {
                tensors.insert(
                    format!("{name}{INPUT_AMAX_SUFFIX}"),
                    TensorData::new(vec![4.0], vec![1]),
                );
            }
        };

        for spec in config.conv_specs().into_iter().flatten() {
            insert_layer(
                &spec.name,
                spec.out_channels,
                spec.in_channels * 9,
                vec![spec.out_channels, spec.in_channels, 3, 3],
            );
        }
        for spec in config.dense_specs() {
            insert_layer(
                &spec.name,
                spec.out_features,
                spec.in_features,
                vec![spec.out_features, spec.in_features],
            );
        }

        Self { tensors }
    }

    /// Consume the checkpoint, returning its tensor map.
    pub fn into_tensors(self) -> HashMap<String, TensorData> {
        self.tensors
    }

    /// Load a SafeTensors checkpoint from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(CotejarError::ModelNotFound {
                path: path.to_path_buf(),
            });
        }

        let bytes = std::fs::read(path)
            .map_err(|e| CotejarError::io(format!("reading {}", path.display()), e))?;
        let safetensors =
            SafeTensors::deserialize(&bytes).map_err(|e| CotejarError::Checkpoint {
                path: path.to_path_buf(),
                message: format!("SafeTensors parsing failed: {e}"),
            })?;

        let mut tensors = HashMap::new();
        for name in safetensors.names() {
            let view = safetensors.tensor(name).map_err(|e| CotejarError::Checkpoint {
                path: path.to_path_buf(),
                message: format!("tensor '{name}': {e}"),
            })?;
            if view.dtype() != Dtype::F32 {
                return Err(CotejarError::Checkpoint {
                    path: path.to_path_buf(),
                    message: format!("tensor '{name}' has dtype {:?}, expected F32", view.dtype()),
                });
            }
            let data: Vec<f32> = view
                .data()
                .chunks_exact(4)
                .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
                .collect();
            tensors.insert(
                name.to_string(),
                TensorData::new(data, view.shape().to_vec()),
            );
        }

        Ok(Self { tensors })
    }

    /// Write the checkpoint as SafeTensors.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let views: Vec<(String, TensorView<'_>)> = self
            .tensors
            .iter()
            .map(|(name, t)| {
                let view =
                    TensorView::new(Dtype::F32, t.shape.clone(), bytemuck::cast_slice(&t.data))
                        .map_err(|e| CotejarError::Checkpoint {
                            path: path.to_path_buf(),
                            message: format!("tensor '{name}': {e}"),
                        })?;
                Ok((name.clone(), view))
            })
            .collect::<Result<_>>()?;

        let bytes = safetensors::serialize(views, &None).map_err(|e| CotejarError::Checkpoint {
            path: path.to_path_buf(),
            message: format!("SafeTensors serialization failed: {e}"),
        })?;
        std::fs::write(path, bytes)
            .map_err(|e| CotejarError::io(format!("writing {}", path.display()), e))
    }

    /// Look up a tensor, erroring if absent.
    pub fn tensor(&self, name: &str) -> Result<&TensorData> {
        self.tensors
            .get(name)
            .ok_or_else(|| CotejarError::MissingTensor { name: name.into() })
    }

    /// Look up a tensor.
    pub fn get(&self, name: &str) -> Option<&TensorData> {
        self.tensors.get(name)
    }

    /// The QAT input range for a layer, when the checkpoint carries one.
    pub fn input_amax(&self, layer: &str) -> Option<f32> {
        self.tensors
            .get(&format!("{layer}{INPUT_AMAX_SUFFIX}"))
            .and_then(|t| t.data.first().copied())
    }

    /// Sorted tensor names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tensors.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of tensors.
    pub fn tensor_count(&self) -> usize {
        self.tensors.len()
    }

    /// Total element count across all tensors.
    pub fn param_count(&self) -> usize {
        self.tensors.values().map(TensorData::len).sum()
    }

    /// Number of QAT range scalars in the checkpoint.
    pub fn quant_range_count(&self) -> usize {
        self.tensors
            .keys()
            .filter(|n| n.ends_with(INPUT_AMAX_SUFFIX))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_checkpoint() -> Checkpoint {
        let mut tensors = HashMap::new();
        tensors.insert(
            "features.0.weight".to_string(),
            TensorData::new(vec![0.5; 12], vec![2, 2, 3]),
        );
        tensors.insert(
            "features.0.bias".to_string(),
            TensorData::new(vec![0.1, 0.2], vec![2]),
        );
        tensors.insert(
            "features.0.input_amax".to_string(),
            TensorData::new(vec![2.75], vec![1]),
        );
        Checkpoint::from_tensors(tensors)
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("model.safetensors");
        sample_checkpoint().save(&path).expect("save should succeed");

        let loaded = Checkpoint::load(&path).expect("load should succeed");
        assert_eq!(loaded.tensor_count(), 3);

        let weight = loaded.tensor("features.0.weight").expect("tensor exists");
        assert_eq!(weight.shape, vec![2, 2, 3]);
        assert_eq!(weight.data, vec![0.5; 12]);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Checkpoint::load("no_such_checkpoint.safetensors");
        assert!(matches!(result, Err(CotejarError::ModelNotFound { .. })));
    }

    #[test]
    fn test_load_invalid_bytes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bad.safetensors");
        std::fs::write(&path, b"not a checkpoint").expect("write");
        let result = Checkpoint::load(&path);
        assert!(matches!(result, Err(CotejarError::Checkpoint { .. })));
    }

    #[test]
    fn test_missing_tensor_error_names_it() {
        let ckpt = sample_checkpoint();
        let err = ckpt.tensor("classifier.0.weight").unwrap_err();
        assert!(err.to_string().contains("classifier.0.weight"));
    }

    #[test]
    fn test_input_amax_lookup() {
        let ckpt = sample_checkpoint();
        assert_eq!(ckpt.input_amax("features.0"), Some(2.75));
        assert_eq!(ckpt.input_amax("features.1"), None);
    }

    #[test]
    fn test_quant_range_count() {
        assert_eq!(sample_checkpoint().quant_range_count(), 1);
    }

    #[test]
    fn test_param_count_sums_elements() {
        assert_eq!(sample_checkpoint().param_count(), 12 + 2 + 1);
    }

    #[test]
    fn test_names_are_sorted() {
        let checkpoint = sample_checkpoint();
        let names = checkpoint.names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }
}
