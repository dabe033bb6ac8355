//! Raw sensor samples and the derived feature vector.

use serde::{Deserialize, Serialize};

/// Number of features derived from one full window.
pub const FEATURE_COUNT: usize = 3;

/// Dimensionality of the reduced (projected) feature space.
pub const REDUCED_DIMENSIONS: usize = 2;

/// One validated sensor reading: extruder encoder count and motor current.
///
/// Immutable once parsed; produced by the line parser, consumed by the
/// sliding window buffer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Cumulative extruder encoder count
    pub encoder_count: f64,
    /// Motor current (amps)
    pub current: f64,
}

impl Sample {
    pub fn new(encoder_count: f64, current: f64) -> Self {
        Self {
            encoder_count,
            current,
        }
    }
}

/// Feature vector derived from one full sample window.
///
/// Recomputed from scratch for every full window, never incrementally
/// updated. Field order matters: the pre-fitted artifacts were trained on
/// columns `[current_per_encoder, current_variance, encoder_slope]` and are
/// sensitive to reordering — always go through [`as_array`](Self::as_array).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Mean current normalized by encoder travel, scaled to the model's units
    pub current_per_encoder: f64,
    /// Unbiased sample variance of current across the window
    pub current_variance: f64,
    /// Linear trend of the encoder count, in counts per sample
    pub encoder_slope: f64,
}

impl FeatureVector {
    /// Features in the fixed column order the trained artifacts expect.
    pub fn as_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.current_per_encoder,
            self.current_variance,
            self.encoder_slope,
        ]
    }

    /// True iff every feature is a finite number.
    pub fn is_finite(&self) -> bool {
        self.as_array().iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_order_is_stable() {
        let features = FeatureVector {
            current_per_encoder: 1.0,
            current_variance: 2.0,
            encoder_slope: 3.0,
        };
        assert_eq!(features.as_array(), [1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_is_finite_rejects_nan() {
        let features = FeatureVector {
            current_per_encoder: f64::NAN,
            current_variance: 0.0,
            encoder_slope: 0.0,
        };
        assert!(!features.is_finite());
    }
}
