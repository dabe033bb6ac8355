//! Pre-fitted model artifacts.
//!
//! Artifacts are parameter exports of the offline training pipeline, one JSON
//! file each: standardization (mean/scale), PCA projection (mean/components),
//! and k-means partition (centroids). They satisfy the [`Transform`]/[`Assign`]
//! capability traits, so any concrete format can be swapped in behind the
//! inference pipeline.
//!
//! Loading failures are fatal at startup — the monitor cannot run without a
//! complete artifact set, and a partial run would silently misclassify.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::inference::InferenceError;

/// A pre-fitted vector-to-vector transform stage.
pub trait Transform: Send + Sync {
    /// Apply the transform. Output length is fixed per artifact.
    fn transform(&self, input: &[f64]) -> Result<Vec<f64>, InferenceError>;
}

/// A pre-fitted partition assigning points to discrete clusters.
pub trait Assign: Send + Sync {
    /// Map a point to the id of its cluster.
    fn predict(&self, point: &[f64]) -> Result<usize, InferenceError>;
}

// ============================================================================
// Standard Scaler
// ============================================================================

/// Per-column standardization: `(x - mean) / scale`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Load from a JSON parameter export.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scaler artifact {}", path.display()))?;
        let scaler: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse scaler artifact {}", path.display()))?;
        scaler.validate()?;
        Ok(scaler)
    }

    fn validate(&self) -> Result<()> {
        if self.mean.is_empty() || self.mean.len() != self.scale.len() {
            anyhow::bail!(
                "Scaler artifact is malformed: {} means vs {} scales",
                self.mean.len(),
                self.scale.len()
            );
        }
        if self.scale.iter().any(|s| !s.is_finite() || *s == 0.0) {
            anyhow::bail!("Scaler artifact has zero or non-finite scale entries");
        }
        Ok(())
    }

    /// Identity scaler of the given width (for tests and dry runs).
    pub fn identity(width: usize) -> Self {
        Self {
            mean: vec![0.0; width],
            scale: vec![1.0; width],
        }
    }
}

impl Transform for StandardScaler {
    fn transform(&self, input: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if input.len() != self.mean.len() {
            return Err(InferenceError::DimensionMismatch {
                stage: "scaler",
                expected: self.mean.len(),
                got: input.len(),
            });
        }
        Ok(input
            .iter()
            .zip(self.mean.iter().zip(self.scale.iter()))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }
}

// ============================================================================
// PCA Projection
// ============================================================================

/// Linear projection onto pre-fitted principal components:
/// `y = components * (x - mean)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PcaProjection {
    /// Column means subtracted before projection
    pub mean: Vec<f64>,
    /// One row per output component, each of input width
    pub components: Vec<Vec<f64>>,
}

impl PcaProjection {
    /// Load from a JSON parameter export.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read projection artifact {}", path.display()))?;
        let pca: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse projection artifact {}", path.display()))?;
        pca.validate()?;
        Ok(pca)
    }

    fn validate(&self) -> Result<()> {
        if self.components.is_empty() {
            anyhow::bail!("Projection artifact has no components");
        }
        if self
            .components
            .iter()
            .any(|row| row.len() != self.mean.len())
        {
            anyhow::bail!(
                "Projection artifact is malformed: component width does not match mean width {}",
                self.mean.len()
            );
        }
        Ok(())
    }

    /// Identity-truncation projection: keeps the first `output` coordinates
    /// of an `input`-wide vector (for tests and dry runs).
    pub fn identity_truncate(input: usize, output: usize) -> Self {
        let components = (0..output)
            .map(|i| {
                let mut row = vec![0.0; input];
                row[i] = 1.0;
                row
            })
            .collect();
        Self {
            mean: vec![0.0; input],
            components,
        }
    }

    /// Output dimensionality of this projection.
    pub fn output_dimensions(&self) -> usize {
        self.components.len()
    }
}

impl Transform for PcaProjection {
    fn transform(&self, input: &[f64]) -> Result<Vec<f64>, InferenceError> {
        if input.len() != self.mean.len() {
            return Err(InferenceError::DimensionMismatch {
                stage: "reducer",
                expected: self.mean.len(),
                got: input.len(),
            });
        }
        let centered: Vec<f64> = input
            .iter()
            .zip(self.mean.iter())
            .map(|(x, m)| x - m)
            .collect();
        Ok(self
            .components
            .iter()
            .map(|row| row.iter().zip(centered.iter()).map(|(a, b)| a * b).sum())
            .collect())
    }
}

// ============================================================================
// K-Means Assigner
// ============================================================================

/// Nearest-centroid assignment over a pre-fitted k-means partition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KMeansAssigner {
    /// One centroid per cluster; cluster id is the row index
    pub centroids: Vec<Vec<f64>>,
}

impl KMeansAssigner {
    /// Load from a JSON parameter export.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read assigner artifact {}", path.display()))?;
        let kmeans: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse assigner artifact {}", path.display()))?;
        kmeans.validate()?;
        Ok(kmeans)
    }

    fn validate(&self) -> Result<()> {
        if self.centroids.is_empty() {
            anyhow::bail!("Assigner artifact has no centroids");
        }
        let width = self.centroids[0].len();
        if width == 0 || self.centroids.iter().any(|c| c.len() != width) {
            anyhow::bail!("Assigner artifact has ragged or empty centroids");
        }
        Ok(())
    }

    /// Single-centroid assigner that returns the given id's row 0 (for tests).
    pub fn constant(dimensions: usize) -> Self {
        Self {
            centroids: vec![vec![0.0; dimensions]],
        }
    }
}

impl Assign for KMeansAssigner {
    fn predict(&self, point: &[f64]) -> Result<usize, InferenceError> {
        let width = self
            .centroids
            .first()
            .map(Vec::len)
            .ok_or(InferenceError::EmptyPartition)?;
        if point.len() != width {
            return Err(InferenceError::DimensionMismatch {
                stage: "assigner",
                expected: width,
                got: point.len(),
            });
        }
        // Squared Euclidean distance; sqrt is monotone so it is skipped.
        let (best, _) = self
            .centroids
            .iter()
            .enumerate()
            .map(|(id, centroid)| {
                let dist: f64 = centroid
                    .iter()
                    .zip(point.iter())
                    .map(|(c, p)| (c - p) * (c - p))
                    .sum();
                (id, dist)
            })
            .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
            .ok_or(InferenceError::EmptyPartition)?;
        Ok(best)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaler_standardizes() {
        let scaler = StandardScaler {
            mean: vec![10.0, 0.0, -5.0],
            scale: vec![2.0, 1.0, 5.0],
        };
        let out = scaler.transform(&[12.0, 3.0, 0.0]).unwrap();
        assert_eq!(out, vec![1.0, 3.0, 1.0]);
    }

    #[test]
    fn test_scaler_rejects_wrong_width() {
        let scaler = StandardScaler::identity(3);
        let err = scaler.transform(&[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::DimensionMismatch {
                stage: "scaler",
                expected: 3,
                got: 2
            }
        ));
    }

    #[test]
    fn test_identity_truncate_projection() {
        let pca = PcaProjection::identity_truncate(3, 2);
        assert_eq!(pca.output_dimensions(), 2);
        let out = pca.transform(&[1.5, -2.5, 99.0]).unwrap();
        assert_eq!(out, vec![1.5, -2.5]);
    }

    #[test]
    fn test_projection_applies_components() {
        // Project onto the sum and difference of the two inputs
        let pca = PcaProjection {
            mean: vec![1.0, 1.0],
            components: vec![vec![1.0, 1.0], vec![1.0, -1.0]],
        };
        let out = pca.transform(&[3.0, 2.0]).unwrap();
        assert_eq!(out, vec![3.0, 1.0]);
    }

    #[test]
    fn test_nearest_centroid_assignment() {
        let kmeans = KMeansAssigner {
            centroids: vec![vec![0.0, 0.0], vec![10.0, 10.0]],
        };
        assert_eq!(kmeans.predict(&[1.0, -1.0]).unwrap(), 0);
        assert_eq!(kmeans.predict(&[9.0, 11.0]).unwrap(), 1);
    }

    #[test]
    fn test_assigner_rejects_wrong_width() {
        let kmeans = KMeansAssigner::constant(2);
        assert!(kmeans.predict(&[1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn test_load_round_trip_via_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");
        let scaler = StandardScaler {
            mean: vec![1.0, 2.0, 3.0],
            scale: vec![0.5, 0.5, 0.5],
        };
        std::fs::write(&path, serde_json::to_string(&scaler).unwrap()).unwrap();

        let loaded = StandardScaler::load(&path).unwrap();
        assert_eq!(loaded.mean, scaler.mean);
        assert_eq!(loaded.scale, scaler.scale);
    }

    #[test]
    fn test_load_rejects_zero_scale() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scaler.json");
        std::fs::write(&path, r#"{"mean":[0.0],"scale":[0.0]}"#).unwrap();
        assert!(StandardScaler::load(&path).is_err());
    }

    #[test]
    fn test_load_missing_artifact_fails() {
        let err = KMeansAssigner::load(Path::new("/nonexistent/kmeans.json")).unwrap_err();
        assert!(err.to_string().contains("kmeans.json"));
    }
}
