//! Activation range observers for calibration.
//!
//! When a checkpoint carries no QAT observer ranges, the engine runs a
//! bounded number of batches through the float model and records each
//! weighted layer's input range with a `RangeObserver`.

/// Range tracking method for an observer
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ObserverMethod {
    /// Track the absolute min/max seen across all batches
    MinMax,
    /// Smoothed max over batches (0 = no smoothing, 1 = fully use new value)
    MovingAverage {
        /// Smoothing factor
        momentum: f32,
    },
}

/// Observes activation batches and reports the absolute maximum.
#[derive(Clone, Debug)]
pub struct RangeObserver {
    method: ObserverMethod,
    running_amax: Option<f32>,
    num_batches: usize,
}

impl RangeObserver {
    /// Create an observer with min-max tracking.
    pub fn min_max() -> Self {
        Self {
            method: ObserverMethod::MinMax,
            running_amax: None,
            num_batches: 0,
        }
    }

    /// Create an observer with moving-average tracking.
    pub fn moving_average(momentum: f32) -> Self {
        Self {
            method: ObserverMethod::MovingAverage { momentum },
            running_amax: None,
            num_batches: 0,
        }
    }

    /// Observe a batch of activations.
    pub fn observe(&mut self, values: &[f32]) {
        if values.is_empty() {
            return;
        }

        let batch_amax = values.iter().fold(0.0f32, |m, &v| m.max(v.abs()));
        self.running_amax = Some(match (self.method, self.running_amax) {
            (ObserverMethod::MinMax, Some(prev)) => prev.max(batch_amax),
            (ObserverMethod::MovingAverage { momentum }, Some(prev)) => {
                prev * (1.0 - momentum) + batch_amax * momentum
            }
            (_, None) => batch_amax,
        });
        self.num_batches += 1;
    }

    /// The observed absolute maximum, if any batch has been seen.
    pub fn amax(&self) -> Option<f32> {
        self.running_amax
    }

    /// Number of batches observed.
    pub fn num_batches(&self) -> usize {
        self.num_batches
    }

    /// Check if any data has been observed.
    pub fn has_data(&self) -> bool {
        self.num_batches > 0
    }

    /// Reset observation state.
    pub fn reset(&mut self) {
        self.running_amax = None;
        self.num_batches = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_min_max_tracks_extremes_across_batches() {
        let mut obs = RangeObserver::min_max();
        obs.observe(&[1.0, -2.0]);
        obs.observe(&[0.5, -0.5]);
        obs.observe(&[-3.5]);
        assert_abs_diff_eq!(obs.amax().expect("observed"), 3.5);
        assert_eq!(obs.num_batches(), 3);
    }

    #[test]
    fn test_moving_average_smooths() {
        let mut obs = RangeObserver::moving_average(0.5);
        obs.observe(&[4.0]);
        obs.observe(&[2.0]);
        // 4.0 * 0.5 + 2.0 * 0.5
        assert_abs_diff_eq!(obs.amax().expect("observed"), 3.0);
    }

    #[test]
    fn test_empty_batch_is_ignored() {
        let mut obs = RangeObserver::min_max();
        obs.observe(&[]);
        assert!(!obs.has_data());
        assert!(obs.amax().is_none());
    }

    #[test]
    fn test_reset_clears_state() {
        let mut obs = RangeObserver::min_max();
        obs.observe(&[1.0]);
        obs.reset();
        assert!(!obs.has_data());
        assert!(obs.amax().is_none());
    }
}
