//! Classification results and the append-only history record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of one inference pass: the projected 2D point, the assigned
/// cluster, and its human-readable condition label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub pca1: f64,
    pub pca2: f64,
    pub cluster_id: usize,
    pub label: String,
}

/// One entry in the classification history.
///
/// Immutable after creation; owned exclusively by the history. Insertion
/// order equals the arrival order of the samples that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub pca1: f64,
    pub pca2: f64,
    pub cluster_id: usize,
    pub label: String,
    pub timestamp: DateTime<Utc>,
}

impl ClassificationRecord {
    /// Stamp a classification with the current wall-clock time.
    pub fn stamp(classification: Classification) -> Self {
        Self {
            pca1: classification.pca1,
            pca2: classification.pca2,
            cluster_id: classification.cluster_id,
            label: classification.label,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_preserves_classification_fields() {
        let classification = Classification {
            pca1: 0.5,
            pca2: -1.5,
            cluster_id: 1,
            label: "Unclogged".to_string(),
        };
        let record = ClassificationRecord::stamp(classification.clone());
        assert_eq!(record.pca1, classification.pca1);
        assert_eq!(record.pca2, classification.pca2);
        assert_eq!(record.cluster_id, classification.cluster_id);
        assert_eq!(record.label, classification.label);
    }
}
