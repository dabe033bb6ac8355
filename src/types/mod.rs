//! Core data types shared across the monitoring pipeline.

mod classification;
mod sample;

pub use classification::{Classification, ClassificationRecord};
pub use sample::{FeatureVector, Sample, FEATURE_COUNT, REDUCED_DIMENSIONS};

use serde::{Deserialize, Serialize};

/// System operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorStatus {
    /// System is starting up
    Initializing,
    /// Collecting samples until the first full window
    Filling,
    /// Normal operation, classifying every sample
    Monitoring,
    /// System error or degraded operation
    Error,
}

impl std::fmt::Display for MonitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorStatus::Initializing => write!(f, "Initializing"),
            MonitorStatus::Filling => write!(f, "Filling"),
            MonitorStatus::Monitoring => write!(f, "Monitoring"),
            MonitorStatus::Error => write!(f, "Error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_status_display() {
        assert_eq!(format!("{}", MonitorStatus::Initializing), "Initializing");
        assert_eq!(format!("{}", MonitorStatus::Filling), "Filling");
        assert_eq!(format!("{}", MonitorStatus::Monitoring), "Monitoring");
        assert_eq!(format!("{}", MonitorStatus::Error), "Error");
    }
}
