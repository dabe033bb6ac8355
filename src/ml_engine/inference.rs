//! Staged inference pipeline.
//!
//! Pure function from a feature vector to a classification, composed of four
//! ordered, swappable stages supplied at startup: imputation, scaling,
//! dimensionality reduction, and cluster assignment. Any stage failure is
//! fatal to that evaluation cycle only — the caller reports it and keeps
//! processing the stream.

use std::collections::BTreeMap;

use crate::types::{Classification, FeatureVector, REDUCED_DIMENSIONS};
use thiserror::Error;
use tracing::debug;

use super::artifacts::{Assign, Transform};

/// Per-cycle inference errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InferenceError {
    /// A stage received a vector of the wrong width.
    #[error("Dimension mismatch in {stage} stage: expected {expected}, got {got}")]
    DimensionMismatch {
        stage: &'static str,
        expected: usize,
        got: usize,
    },

    /// The assigner produced a cluster id with no configured label.
    ///
    /// This indicates an artifact/config version mismatch and is surfaced
    /// distinctly — it must never be silently defaulted to a label.
    #[error("Cluster id {cluster_id} has no configured condition label")]
    UnknownCluster { cluster_id: usize },

    /// The partition artifact holds no centroids.
    #[error("Cluster partition is empty")]
    EmptyPartition,
}

/// Chained impute → scale → reduce → assign inference with label lookup.
pub struct InferencePipeline {
    scaler: Box<dyn Transform>,
    reducer: Box<dyn Transform>,
    assigner: Box<dyn Assign>,
    /// Cluster id → condition label
    labels: BTreeMap<usize, String>,
    /// Substituted for non-finite feature values by the imputation stage
    impute_fallback: f64,
}

impl InferencePipeline {
    pub fn new(
        scaler: Box<dyn Transform>,
        reducer: Box<dyn Transform>,
        assigner: Box<dyn Assign>,
        labels: BTreeMap<usize, String>,
        impute_fallback: f64,
    ) -> Self {
        Self {
            scaler,
            reducer,
            assigner,
            labels,
            impute_fallback,
        }
    }

    /// Classify one feature vector.
    ///
    /// Succeeds with the reduced 2D coordinates, the assigned cluster id and
    /// its label; the caller stamps a timestamp and appends to history.
    pub fn classify(&self, features: &FeatureVector) -> Result<Classification, InferenceError> {
        let imputed = self.impute(features);
        let scaled = self.scaler.transform(&imputed)?;
        let reduced = self.reducer.transform(&scaled)?;

        if reduced.len() != REDUCED_DIMENSIONS {
            return Err(InferenceError::DimensionMismatch {
                stage: "reducer",
                expected: REDUCED_DIMENSIONS,
                got: reduced.len(),
            });
        }

        let cluster_id = self.assigner.predict(&reduced)?;
        let label = self
            .labels
            .get(&cluster_id)
            .ok_or(InferenceError::UnknownCluster { cluster_id })?;

        Ok(Classification {
            pca1: reduced[0],
            pca2: reduced[1],
            cluster_id,
            label: label.clone(),
        })
    }

    /// Replace non-finite feature values with the configured fallback.
    ///
    /// A no-op when all three features are finite, which the degenerate
    /// window guard upstream already ensures for the rate feature. The stage
    /// exists defensively for NaN/Inf leaking out of pathological windows.
    fn impute(&self, features: &FeatureVector) -> Vec<f64> {
        features
            .as_array()
            .iter()
            .map(|v| {
                if v.is_finite() {
                    *v
                } else {
                    debug!(fallback = self.impute_fallback, "Imputed non-finite feature value");
                    self.impute_fallback
                }
            })
            .collect()
    }

    /// The configured label map (for the dashboard).
    pub fn labels(&self) -> &BTreeMap<usize, String> {
        &self.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml_engine::artifacts::{KMeansAssigner, PcaProjection, StandardScaler};
    use crate::types::FEATURE_COUNT;

    fn default_labels() -> BTreeMap<usize, String> {
        BTreeMap::from([(0, "Clogged".to_string()), (1, "Unclogged".to_string())])
    }

    /// Identity scaler + identity-truncate reducer + single-cluster assigner.
    fn identity_pipeline() -> InferencePipeline {
        InferencePipeline::new(
            Box::new(StandardScaler::identity(FEATURE_COUNT)),
            Box::new(PcaProjection::identity_truncate(
                FEATURE_COUNT,
                REDUCED_DIMENSIONS,
            )),
            Box::new(KMeansAssigner::constant(REDUCED_DIMENSIONS)),
            default_labels(),
            0.0,
        )
    }

    fn features(a: f64, b: f64, c: f64) -> FeatureVector {
        FeatureVector {
            current_per_encoder: a,
            current_variance: b,
            encoder_slope: c,
        }
    }

    #[test]
    fn test_identity_pipeline_passes_coordinates_through() {
        let pipeline = identity_pipeline();
        let result = pipeline.classify(&features(1.25, -0.5, 3.0)).unwrap();
        assert_eq!(result.pca1, 1.25);
        assert_eq!(result.pca2, -0.5);
        assert_eq!(result.cluster_id, 0);
        assert_eq!(result.label, "Clogged");
    }

    #[test]
    fn test_classification_is_deterministic() {
        let pipeline = identity_pipeline();
        let input = features(0.8, 0.01, 2.0);
        let first = pipeline.classify(&input).unwrap();
        for _ in 0..10 {
            assert_eq!(pipeline.classify(&input).unwrap(), first);
        }
    }

    #[test]
    fn test_imputation_replaces_non_finite() {
        let pipeline = InferencePipeline::new(
            Box::new(StandardScaler::identity(FEATURE_COUNT)),
            Box::new(PcaProjection::identity_truncate(
                FEATURE_COUNT,
                REDUCED_DIMENSIONS,
            )),
            Box::new(KMeansAssigner::constant(REDUCED_DIMENSIONS)),
            default_labels(),
            -7.0,
        );
        let result = pipeline
            .classify(&features(f64::NAN, f64::INFINITY, 1.0))
            .unwrap();
        assert_eq!(result.pca1, -7.0);
        assert_eq!(result.pca2, -7.0);
    }

    #[test]
    fn test_unknown_cluster_is_distinct_error() {
        // Assigner with two centroids but labels only for id 0
        let pipeline = InferencePipeline::new(
            Box::new(StandardScaler::identity(FEATURE_COUNT)),
            Box::new(PcaProjection::identity_truncate(
                FEATURE_COUNT,
                REDUCED_DIMENSIONS,
            )),
            Box::new(KMeansAssigner {
                centroids: vec![vec![0.0, 0.0], vec![10.0, 10.0]],
            }),
            BTreeMap::from([(0, "Clogged".to_string())]),
            0.0,
        );
        // Lands nearest the unlabeled centroid 1
        let err = pipeline.classify(&features(10.0, 10.0, 0.0)).unwrap_err();
        assert_eq!(err, InferenceError::UnknownCluster { cluster_id: 1 });
    }

    #[test]
    fn test_reducer_must_output_two_dimensions() {
        let pipeline = InferencePipeline::new(
            Box::new(StandardScaler::identity(FEATURE_COUNT)),
            // Projects to 3 dimensions — a mis-exported artifact
            Box::new(PcaProjection::identity_truncate(FEATURE_COUNT, 3)),
            Box::new(KMeansAssigner::constant(REDUCED_DIMENSIONS)),
            default_labels(),
            0.0,
        );
        let err = pipeline.classify(&features(1.0, 1.0, 1.0)).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::DimensionMismatch {
                stage: "reducer",
                expected: 2,
                got: 3
            }
        ));
    }
}
