//! Architecture configuration for VGG-style classifiers.

use serde::{Deserialize, Serialize};

use crate::{CotejarError, Result};

/// One convolution layer the config calls for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvSpec {
    /// Checkpoint name prefix (e.g. `features.3`)
    pub name: String,
    /// Input channels
    pub in_channels: usize,
    /// Output channels
    pub out_channels: usize,
}

/// One dense layer the config calls for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DenseSpec {
    /// Checkpoint name prefix (e.g. `classifier.1`)
    pub name: String,
    /// Input features
    pub in_features: usize,
    /// Output features
    pub out_features: usize,
}

/// VGG-style architecture: convolutional blocks separated by 2x2 max
/// pooling, then a dense classifier head.
///
/// Every convolution is 3x3 stride-1 pad-1 followed by ReLU; every block
/// ends with a halving max pool. Checkpoint tensors are named
/// `features.{i}.weight` / `features.{i}.bias` with `i` counting
/// convolutions across blocks, and `classifier.{j}.weight` / `.bias` for
/// the head. QAT checkpoints additionally carry `{layer}.input_amax`
/// scalars.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VggConfig {
    /// Convolution output widths, grouped by block
    pub blocks: Vec<Vec<usize>>,
    /// Hidden widths of the classifier head
    pub classifier: Vec<usize>,
    /// Number of output classes
    pub num_classes: usize,
    /// Input channels
    pub in_channels: usize,
    /// Input spatial size (height, width)
    pub input_hw: (usize, usize),
}

impl VggConfig {
    /// The VGG16 layout the CIFAR-10 QAT checkpoint uses.
    pub fn vgg16() -> Self {
        Self {
            blocks: vec![
                vec![64, 64],
                vec![128, 128],
                vec![256, 256, 256],
                vec![512, 512, 512],
                vec![512, 512, 512],
            ],
            classifier: vec![4096, 4096],
            num_classes: 10,
            in_channels: 3,
            input_hw: (32, 32),
        }
    }

    /// A small layout for tests.
    pub fn tiny() -> Self {
        Self {
            blocks: vec![vec![4], vec![8]],
            classifier: vec![16],
            num_classes: 10,
            in_channels: 3,
            input_hw: (32, 32),
        }
    }

    /// Validate the architecture.
    pub fn validate(&self) -> Result<()> {
        if self.blocks.is_empty() || self.blocks.iter().any(Vec::is_empty) {
            return Err(CotejarError::ConfigValue {
                field: "blocks".into(),
                message: "every block needs at least one convolution".into(),
                suggestion: "Use VggConfig::vgg16() as a starting point".into(),
            });
        }
        if self.num_classes == 0 || self.in_channels == 0 {
            return Err(CotejarError::ConfigValue {
                field: "num_classes/in_channels".into(),
                message: "class and channel counts must be non-zero".into(),
                suggestion: "CIFAR-10 uses 10 classes over 3-channel images".into(),
            });
        }
        let halvings = 1usize << self.blocks.len();
        if self.input_hw.0 % halvings != 0 || self.input_hw.1 % halvings != 0 {
            return Err(CotejarError::ConfigValue {
                field: "input_hw".into(),
                message: format!(
                    "input {}x{} is not divisible by 2^{} for {} pooling stages",
                    self.input_hw.0,
                    self.input_hw.1,
                    self.blocks.len(),
                    self.blocks.len()
                ),
                suggestion: "Use a 32x32 input for the five-block VGG16 layout".into(),
            });
        }
        Ok(())
    }

    /// Spatial size of the feature map after all pooling stages.
    pub fn feature_hw(&self) -> (usize, usize) {
        let halvings = 1usize << self.blocks.len();
        (self.input_hw.0 / halvings, self.input_hw.1 / halvings)
    }

    /// Flattened feature count entering the classifier head.
    pub fn flattened_features(&self) -> usize {
        let (h, w) = self.feature_hw();
        let last_width = self
            .blocks
            .last()
            .and_then(|b| b.last())
            .copied()
            .unwrap_or(self.in_channels);
        last_width * h * w
    }

    /// Convolution layers in execution order, grouped by block.
    pub fn conv_specs(&self) -> Vec<Vec<ConvSpec>> {
        let mut index = 0;
        let mut in_channels = self.in_channels;
        self.blocks
            .iter()
            .map(|block| {
                block
                    .iter()
                    .map(|&out_channels| {
                        let spec = ConvSpec {
                            name: format!("features.{index}"),
                            in_channels,
                            out_channels,
                        };
                        index += 1;
                        in_channels = out_channels;
                        spec
                    })
                    .collect()
            })
            .collect()
    }

    /// Dense layers in execution order, the final one mapping to classes.
    pub fn dense_specs(&self) -> Vec<DenseSpec> {
        let widths: Vec<usize> = std::iter::once(self.flattened_features())
            .chain(self.classifier.iter().copied())
            .chain(std::iter::once(self.num_classes))
            .collect();
        widths
            .windows(2)
            .enumerate()
            .map(|(j, pair)| DenseSpec {
                name: format!("classifier.{j}"),
                in_features: pair[0],
                out_features: pair[1],
            })
            .collect()
    }

    /// Total parameter count (weights and biases).
    pub fn num_parameters(&self) -> usize {
        let conv: usize = self
            .conv_specs()
            .iter()
            .flatten()
            .map(|s| s.out_channels * s.in_channels * 9 + s.out_channels)
            .sum();
        let dense: usize = self
            .dense_specs()
            .iter()
            .map(|s| s.out_features * s.in_features + s.out_features)
            .sum();
        conv + dense
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vgg16_layout() {
        let config = VggConfig::vgg16();
        assert!(config.validate().is_ok());
        assert_eq!(config.blocks.len(), 5);
        assert_eq!(config.conv_specs().iter().flatten().count(), 13);
        assert_eq!(config.feature_hw(), (1, 1));
        assert_eq!(config.flattened_features(), 512);
    }

    #[test]
    fn test_vgg16_dense_chain() {
        let specs = VggConfig::vgg16().dense_specs();
        assert_eq!(specs.len(), 3);
        assert_eq!(specs[0].in_features, 512);
        assert_eq!(specs[0].out_features, 4096);
        assert_eq!(specs[2].out_features, 10);
        assert_eq!(specs[2].name, "classifier.2");
    }

    #[test]
    fn test_conv_names_count_across_blocks() {
        let specs = VggConfig::tiny().conv_specs();
        assert_eq!(specs[0][0].name, "features.0");
        assert_eq!(specs[1][0].name, "features.1");
        assert_eq!(specs[0][0].in_channels, 3);
        assert_eq!(specs[1][0].in_channels, 4);
    }

    #[test]
    fn test_tiny_flattened_features() {
        // 32 -> 16 -> 8 spatial, 8 channels
        assert_eq!(VggConfig::tiny().flattened_features(), 8 * 8 * 8);
    }

    #[test]
    fn test_validate_rejects_empty_block() {
        let mut config = VggConfig::tiny();
        config.blocks.push(vec![]);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_indivisible_input() {
        let mut config = VggConfig::tiny();
        config.input_hw = (30, 30);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_num_parameters_tiny() {
        let config = VggConfig::tiny();
        let conv = 4 * 3 * 9 + 4 + 8 * 4 * 9 + 8;
        let dense = 16 * 512 + 16 + 10 * 16 + 10;
        assert_eq!(config.num_parameters(), conv + dense);
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = VggConfig::vgg16();
        let json = serde_json::to_string(&config).expect("serialize");
        let back: VggConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, config);
    }
}
