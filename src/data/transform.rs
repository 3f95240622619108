//! Per-channel image normalization.

use serde::{Deserialize, Serialize};

/// Per-channel normalization: `(pixel / 255 - mean) / std`.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Normalize {
    /// Per-channel means (of the 0..1 scaled pixels)
    pub mean: [f32; 3],
    /// Per-channel standard deviations
    pub std: [f32; 3],
}

impl Normalize {
    /// The canonical CIFAR-10 statistics.
    pub fn cifar10() -> Self {
        Self {
            mean: [0.4914, 0.4822, 0.4465],
            std: [0.2023, 0.1994, 0.2010],
        }
    }

    /// Normalize one channel-planar image (all of channel 0, then 1, then 2).
    pub fn apply(&self, pixels: &[u8]) -> Vec<f32> {
        let plane = pixels.len() / 3;
        pixels
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let c = (i / plane.max(1)).min(2);
                (f32::from(p) / 255.0 - self.mean[c]) / self.std[c]
            })
            .collect()
    }
}

impl Default for Normalize {
    fn default() -> Self {
        Self::cifar10()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_cifar10_statistics() {
        let norm = Normalize::cifar10();
        assert_abs_diff_eq!(norm.mean[0], 0.4914);
        assert_abs_diff_eq!(norm.std[2], 0.2010);
    }

    #[test]
    fn test_apply_uses_channel_statistics() {
        let norm = Normalize {
            mean: [0.0, 0.5, 1.0],
            std: [1.0, 1.0, 2.0],
        };
        // 2 pixels per plane, all at full intensity
        let pixels = vec![255u8; 6];
        let out = norm.apply(&pixels);
        assert_abs_diff_eq!(out[0], 1.0);
        assert_abs_diff_eq!(out[2], 0.5);
        assert_abs_diff_eq!(out[4], 0.0);
    }

    #[test]
    fn test_apply_zero_pixel() {
        let norm = Normalize::cifar10();
        let out = norm.apply(&[0u8; 3]);
        assert_abs_diff_eq!(out[0], -0.4914 / 0.2023, epsilon = 1e-5);
    }

    #[test]
    fn test_apply_preserves_length() {
        let norm = Normalize::cifar10();
        assert_eq!(norm.apply(&[128u8; 3072]).len(), 3072);
    }
}
