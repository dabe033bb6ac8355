//! System-wide default constants.
//!
//! Centralises the pipeline's magic numbers. Grouped by subsystem for easy
//! discovery; every value here can be overridden through `monitor_config.toml`
//! unless noted otherwise.

// ============================================================================
// Pipeline
// ============================================================================

/// Sliding window capacity (samples). One feature vector per full window.
pub const WINDOW_SIZE: usize = 200;

/// Multiplier applied to mean-current-per-encoder-count.
///
/// The trained artifacts expect this feature in milliamp-per-count units.
pub const CURRENT_PER_ENCODER_SCALE: f64 = 1000.0;

/// Fallback substituted for non-finite feature values by the imputation stage.
pub const IMPUTE_FALLBACK: f64 = 0.0;

/// Progress log cadence in the processing loop (samples).
pub const PROGRESS_LOG_INTERVAL: u64 = 100;

// ============================================================================
// Acquisition
// ============================================================================

/// Default per-line read timeout (seconds).
///
/// The firmware streams at roughly 10 Hz; 10 s of silence means the bridge
/// or the microcontroller has stalled and a reconnect is warranted.
pub const READ_TIMEOUT_SECS: u64 = 10;

/// Default connect timeout for the serial-bridge TCP link (seconds).
pub const CONNECT_TIMEOUT_SECS: u64 = 30;

// ============================================================================
// Dashboard
// ============================================================================

/// Capacity of the live raw-sample echo buffer (samples).
///
/// 600 = one minute at the nominal 10 Hz sample rate.
pub const RECENT_SAMPLES_CAPACITY: usize = 600;

/// Default number of history records returned by the history endpoint.
pub const DEFAULT_HISTORY_LIMIT: usize = 500;

// ============================================================================
// Simulation
// ============================================================================

/// Base delay denominator for the replay `--speed` flag (milliseconds).
pub const REPLAY_BASE_DELAY_MS: u64 = 100;
