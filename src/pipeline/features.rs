//! Window feature derivation.
//!
//! Each full window is summarized into three features the trained artifacts
//! were fitted on: current normalized by encoder travel, current variance,
//! and the linear encoder trend. Features are recomputed from scratch per
//! window — never incrementally updated.

use crate::types::{FeatureVector, Sample};
use statrs::statistics::{Data, Distribution};
use thiserror::Error;

/// Feature extraction errors. Non-fatal: the evaluation cycle is skipped.
#[derive(Debug, Error, PartialEq)]
pub enum FeatureError {
    /// Encoder travel across the window is zero or non-finite, leaving the
    /// rate-normalized current undefined. Typical cause: a stalled or
    /// disconnected encoder feeding a constant count.
    #[error("Degenerate window: encoder travel is {encoder_diff}")]
    DegenerateWindow { encoder_diff: f64 },

    /// The caller handed over a window of the wrong length.
    #[error("Window has {got} samples, feature extraction requires {expected}")]
    WrongWindowLength { expected: usize, got: usize },
}

/// Derives the fixed three-feature vector from full windows.
pub struct FeatureExtractor {
    window_size: usize,
    /// Multiplier on mean-current-per-count, matching the model's units
    scale: f64,
}

impl FeatureExtractor {
    pub fn new(window_size: usize, scale: f64) -> Self {
        Self { window_size, scale }
    }

    /// Compute the feature vector for one full window (oldest sample first).
    ///
    /// Variance is the unbiased sample variance (n−1 denominator) — the same
    /// estimator the training pipeline used; switching estimators would
    /// silently shift the feature distribution under the fitted scaler.
    pub fn extract(&self, window: &[Sample]) -> Result<FeatureVector, FeatureError> {
        if window.len() != self.window_size {
            return Err(FeatureError::WrongWindowLength {
                expected: self.window_size,
                got: window.len(),
            });
        }

        let currents: Vec<f64> = window.iter().map(|s| s.current).collect();
        let data = Data::new(currents);
        let current_mean = data.mean().unwrap_or(f64::NAN);
        let current_variance = data.variance().unwrap_or(f64::NAN);

        let (Some(first), Some(last)) = (window.first(), window.last()) else {
            return Err(FeatureError::WrongWindowLength {
                expected: self.window_size,
                got: 0,
            });
        };
        let encoder_diff = (last.encoder_count - first.encoder_count).abs();

        if encoder_diff == 0.0 || !encoder_diff.is_finite() {
            return Err(FeatureError::DegenerateWindow { encoder_diff });
        }

        let current_per_encoder = (current_mean / encoder_diff) * self.scale;
        let encoder_slope = Self::slope(window);

        Ok(FeatureVector {
            current_per_encoder,
            current_variance,
            encoder_slope,
        })
    }

    /// Degree-1 least-squares slope of encoder count against sample index.
    ///
    /// Closed form: `Σ(xi − x̄)(yi − ȳ) / Σ(xi − x̄)²` with x = 0..n.
    fn slope(window: &[Sample]) -> f64 {
        let n = window.len() as f64;
        let x_mean = (n - 1.0) / 2.0;
        let y_mean = window.iter().map(|s| s.encoder_count).sum::<f64>() / n;

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (i, s) in window.iter().enumerate() {
            let dx = i as f64 - x_mean;
            numerator += dx * (s.encoder_count - y_mean);
            denominator += dx * dx;
        }

        if denominator == 0.0 {
            0.0
        } else {
            numerator / denominator
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: usize = 200;
    const SCALE: f64 = 1000.0;

    fn extractor() -> FeatureExtractor {
        FeatureExtractor::new(WINDOW, SCALE)
    }

    /// window of (encoder, current) pairs from closures over the index
    fn window(enc: impl Fn(usize) -> f64, cur: impl Fn(usize) -> f64) -> Vec<Sample> {
        (0..WINDOW).map(|i| Sample::new(enc(i), cur(i))).collect()
    }

    #[test]
    fn test_linear_encoder_has_unit_slope() {
        let features = extractor()
            .extract(&window(|i| 500.0 + i as f64, |_| 0.5))
            .unwrap();
        assert!((features.encoder_slope - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_steeper_encoder_scales_slope() {
        let features = extractor()
            .extract(&window(|i| 3.5 * i as f64, |_| 0.5))
            .unwrap();
        assert!((features.encoder_slope - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_rate_feature_formula() {
        // Constant current 0.4 A, encoder travels 0 -> 199 counts
        let features = extractor()
            .extract(&window(|i| i as f64, |_| 0.4))
            .unwrap();
        let expected = (0.4 / 199.0) * SCALE;
        assert!((features.current_per_encoder - expected).abs() < 1e-9);
    }

    #[test]
    fn test_variance_is_unbiased_sample_variance() {
        // Alternating current 0.0 / 1.0: mean 0.5, sample variance
        // n/(4(n-1)) for even n
        let features = extractor()
            .extract(&window(|i| i as f64, |i| (i % 2) as f64))
            .unwrap();
        let n = WINDOW as f64;
        let expected = n / (4.0 * (n - 1.0));
        assert!((features.current_variance - expected).abs() < 1e-12);
    }

    #[test]
    fn test_constant_current_has_zero_variance() {
        let features = extractor()
            .extract(&window(|i| i as f64, |_| 0.75))
            .unwrap();
        assert!(features.current_variance.abs() < 1e-12);
    }

    #[test]
    fn test_constant_encoder_is_degenerate() {
        let err = extractor()
            .extract(&window(|_| 500.0, |i| i as f64 * 0.01))
            .unwrap_err();
        assert_eq!(err, FeatureError::DegenerateWindow { encoder_diff: 0.0 });
    }

    #[test]
    fn test_equal_endpoints_are_degenerate() {
        // Encoder moves mid-window but returns to its start value; the
        // endpoint difference is what the rate feature divides by.
        let err = extractor()
            .extract(&window(
                |i| if i == 0 || i == WINDOW - 1 { 100.0 } else { 150.0 },
                |_| 0.5,
            ))
            .unwrap_err();
        assert!(matches!(err, FeatureError::DegenerateWindow { .. }));
    }

    #[test]
    fn test_non_finite_encoder_diff_is_degenerate() {
        let err = extractor()
            .extract(&window(
                |i| if i == WINDOW - 1 { f64::NAN } else { i as f64 },
                |_| 0.5,
            ))
            .unwrap_err();
        assert!(matches!(err, FeatureError::DegenerateWindow { .. }));
    }

    #[test]
    fn test_short_window_is_rejected() {
        let samples: Vec<Sample> = (0..199).map(|i| Sample::new(i as f64, 0.5)).collect();
        let err = extractor().extract(&samples).unwrap_err();
        assert_eq!(
            err,
            FeatureError::WrongWindowLength {
                expected: 200,
                got: 199
            }
        );
    }
}
