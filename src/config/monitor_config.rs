//! Monitor Configuration - pipeline tunables as operator-editable TOML values
//!
//! Each struct implements `Default` with values matching the trained model's
//! expectations, ensuring zero-change behavior when no config file is present.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a monitor deployment.
///
/// Load with `MonitorConfig::load()` which searches:
/// 1. `$NOZZLE_CONFIG` env var
/// 2. `./monitor_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Equipment identification
    #[serde(default)]
    pub monitor: MonitorInfo,

    /// Sliding window parameters
    #[serde(default)]
    pub window: WindowConfig,

    /// Feature derivation tunables
    #[serde(default)]
    pub features: FeatureConfig,

    /// Cluster-id to condition-label mapping
    #[serde(default)]
    pub labels: LabelConfig,

    /// Sensor acquisition timeouts
    #[serde(default)]
    pub acquisition: AcquisitionConfig,

    /// Pre-fitted artifact locations
    #[serde(default)]
    pub artifacts: ArtifactConfig,

    /// Dashboard API server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            monitor: MonitorInfo::default(),
            window: WindowConfig::default(),
            features: FeatureConfig::default(),
            labels: LabelConfig::default(),
            acquisition: AcquisitionConfig::default(),
            artifacts: ArtifactConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration using the standard search order:
    /// 1. `$NOZZLE_CONFIG` environment variable
    /// 2. `./monitor_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("NOZZLE_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), equipment = %config.monitor.equipment_id, "Loaded monitor config from NOZZLE_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from NOZZLE_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "NOZZLE_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("monitor_config.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(equipment = %config.monitor.equipment_id, "Loaded monitor config from ./monitor_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./monitor_config.toml, using defaults");
                }
            }
        }

        info!("No monitor_config.toml found — using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.size < 2 {
            return Err(ConfigError::Invalid(format!(
                "window.size must be at least 2 (got {})",
                self.window.size
            )));
        }
        if !self.features.scale.is_finite() || self.features.scale == 0.0 {
            return Err(ConfigError::Invalid(format!(
                "features.scale must be finite and non-zero (got {})",
                self.features.scale
            )));
        }
        if self.acquisition.read_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "acquisition.read_timeout_secs must be positive".to_string(),
            ));
        }
        self.labels.validate()?;
        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ============================================================================
// Sections
// ============================================================================

/// Equipment identification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorInfo {
    /// Equipment identifier used in logs, storage, and the dashboard
    #[serde(default = "MonitorInfo::default_equipment_id")]
    pub equipment_id: String,
}

impl MonitorInfo {
    fn default_equipment_id() -> String {
        "NOZZLE-01".to_string()
    }
}

impl Default for MonitorInfo {
    fn default() -> Self {
        Self {
            equipment_id: Self::default_equipment_id(),
        }
    }
}

/// Sliding window parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Window capacity in samples; one classification per full window
    #[serde(default = "WindowConfig::default_size")]
    pub size: usize,
}

impl WindowConfig {
    fn default_size() -> usize {
        defaults::WINDOW_SIZE
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            size: Self::default_size(),
        }
    }
}

/// Feature derivation tunables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Multiplier applied to mean-current-per-encoder-count.
    ///
    /// Must match the units the artifacts were trained with.
    #[serde(default = "FeatureConfig::default_scale")]
    pub scale: f64,

    /// Value substituted for non-finite features by the imputation stage
    #[serde(default = "FeatureConfig::default_impute_fallback")]
    pub impute_fallback: f64,
}

impl FeatureConfig {
    fn default_scale() -> f64 {
        defaults::CURRENT_PER_ENCODER_SCALE
    }

    fn default_impute_fallback() -> f64 {
        defaults::IMPUTE_FALLBACK
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            scale: Self::default_scale(),
            impute_fallback: Self::default_impute_fallback(),
        }
    }
}

/// Cluster-id to condition-label mapping.
///
/// TOML keys are strings; they must parse as non-negative integers:
///
/// ```toml
/// [labels.clusters]
/// 0 = "Clogged"
/// 1 = "Unclogged"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelConfig {
    #[serde(default = "LabelConfig::default_clusters")]
    pub clusters: BTreeMap<String, String>,
}

impl LabelConfig {
    fn default_clusters() -> BTreeMap<String, String> {
        BTreeMap::from([
            ("0".to_string(), "Clogged".to_string()),
            ("1".to_string(), "Unclogged".to_string()),
        ])
    }

    /// Parse into the runtime id → label map.
    ///
    /// Call after `validate()`; unparseable keys are skipped here because
    /// validation has already rejected them.
    pub fn to_map(&self) -> BTreeMap<usize, String> {
        self.clusters
            .iter()
            .filter_map(|(k, v)| k.parse::<usize>().ok().map(|id| (id, v.clone())))
            .collect()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.clusters.is_empty() {
            return Err(ConfigError::Invalid(
                "labels.clusters must not be empty".to_string(),
            ));
        }
        let mut seen = std::collections::BTreeSet::new();
        for (key, label) in &self.clusters {
            if key.parse::<usize>().is_err() {
                return Err(ConfigError::Invalid(format!(
                    "labels.clusters key '{}' is not a non-negative integer",
                    key
                )));
            }
            if label.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "labels.clusters[{}] is empty",
                    key
                )));
            }
            if !seen.insert(label.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "labels.clusters maps two cluster ids to '{}'",
                    label
                )));
            }
        }
        Ok(())
    }
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            clusters: Self::default_clusters(),
        }
    }
}

/// Sensor acquisition timeouts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquisitionConfig {
    /// Per-line read timeout (seconds); silence past this triggers a reconnect
    #[serde(default = "AcquisitionConfig::default_read_timeout_secs")]
    pub read_timeout_secs: u64,

    /// TCP connect timeout for the serial bridge (seconds)
    #[serde(default = "AcquisitionConfig::default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl AcquisitionConfig {
    fn default_read_timeout_secs() -> u64 {
        defaults::READ_TIMEOUT_SECS
    }

    fn default_connect_timeout_secs() -> u64 {
        defaults::CONNECT_TIMEOUT_SECS
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            read_timeout_secs: Self::default_read_timeout_secs(),
            connect_timeout_secs: Self::default_connect_timeout_secs(),
        }
    }
}

/// Pre-fitted artifact locations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactConfig {
    /// Standardization parameters (JSON export of the fitted scaler)
    #[serde(default = "ArtifactConfig::default_scaler")]
    pub scaler: PathBuf,

    /// Projection parameters (JSON export of the fitted PCA)
    #[serde(default = "ArtifactConfig::default_reducer")]
    pub reducer: PathBuf,

    /// Partition parameters (JSON export of the fitted k-means)
    #[serde(default = "ArtifactConfig::default_assigner")]
    pub assigner: PathBuf,
}

impl ArtifactConfig {
    fn default_scaler() -> PathBuf {
        PathBuf::from("artifacts/scaler.json")
    }

    fn default_reducer() -> PathBuf {
        PathBuf::from("artifacts/pca.json")
    }

    fn default_assigner() -> PathBuf {
        PathBuf::from("artifacts/kmeans.json")
    }
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            scaler: Self::default_scaler(),
            reducer: Self::default_reducer(),
            assigner: Self::default_assigner(),
        }
    }
}

/// Dashboard API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind address
    #[serde(default = "ServerConfig::default_addr")]
    pub addr: String,

    /// Capacity of the live raw-sample echo buffer
    #[serde(default = "ServerConfig::default_recent_samples")]
    pub recent_samples: usize,
}

impl ServerConfig {
    fn default_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    fn default_recent_samples() -> usize {
        defaults::RECENT_SAMPLES_CAPACITY
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: Self::default_addr(),
            recent_samples: Self::default_recent_samples(),
        }
    }
}
