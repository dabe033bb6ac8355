//! Session State
//!
//! Shared state for one monitoring session, accessible from API handlers and
//! the sample processing task. Created on connect, torn down on disconnect —
//! never ambient global state.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::time::Instant;

use crate::types::{ClassificationRecord, MonitorStatus, Sample};

fn default_recent_capacity() -> usize {
    crate::config::defaults::RECENT_SAMPLES_CAPACITY
}

/// Shared session state for one monitoring run.
///
/// This struct is wrapped in `Arc<RwLock<>>` for thread-safe access across
/// the async runtime. The processing loop is the only writer; a record is
/// only ever appended whole, so readers never observe a partial entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorState {
    /// Equipment identifier for display and storage
    pub equipment_id: String,

    /// Session uptime (not serialized)
    #[serde(skip, default = "Instant::now")]
    pub uptime: Instant,

    /// Current system status
    pub status: MonitorStatus,

    /// Samples accepted during this session
    pub samples_collected: u64,

    /// Latest raw sample for live metric display
    pub latest_sample: Option<Sample>,

    /// Bounded echo of recent raw samples for the live sensor chart
    #[serde(skip)]
    pub recent_samples: VecDeque<Sample>,

    /// Capacity of `recent_samples`
    #[serde(skip, default = "default_recent_capacity")]
    recent_capacity: usize,

    /// Append-only classification history, insertion order = arrival order
    pub history: Vec<ClassificationRecord>,

    /// Per-label classification tallies for the distribution display
    pub label_counts: BTreeMap<String, u64>,

    /// Last classification timestamp
    pub last_classification_time: Option<chrono::DateTime<chrono::Utc>>,
}

impl Default for MonitorState {
    /// Deterministic zero-value suitable for tests. Production startup uses
    /// [`MonitorState::from_config()`].
    fn default() -> Self {
        Self {
            equipment_id: "NOZZLE-01".to_string(),
            uptime: Instant::now(),
            status: MonitorStatus::Initializing,
            samples_collected: 0,
            latest_sample: None,
            recent_samples: VecDeque::with_capacity(crate::config::defaults::RECENT_SAMPLES_CAPACITY),
            recent_capacity: crate::config::defaults::RECENT_SAMPLES_CAPACITY,
            history: Vec::new(),
            label_counts: BTreeMap::new(),
            last_classification_time: None,
        }
    }
}

impl MonitorState {
    /// Build session state from the loaded configuration.
    pub fn from_config() -> Self {
        let cfg = crate::config::get();
        Self {
            equipment_id: cfg.monitor.equipment_id.clone(),
            recent_samples: VecDeque::with_capacity(cfg.server.recent_samples),
            recent_capacity: cfg.server.recent_samples,
            ..Self::default()
        }
    }

    /// Record an accepted raw sample (echoed for live display).
    pub fn record_sample(&mut self, sample: Sample) {
        self.samples_collected += 1;
        self.latest_sample = Some(sample);
        if self.recent_samples.len() >= self.recent_capacity {
            self.recent_samples.pop_front();
        }
        self.recent_samples.push_back(sample);
    }

    /// Append a classification record atomically (whole record or nothing).
    pub fn append_record(&mut self, record: ClassificationRecord) {
        self.last_classification_time = Some(record.timestamp);
        *self.label_counts.entry(record.label.clone()).or_insert(0) += 1;
        self.history.push(record);
    }

    /// Percentage share per label over all classifications this session.
    pub fn label_distribution(&self) -> BTreeMap<String, f64> {
        let total: u64 = self.label_counts.values().sum();
        if total == 0 {
            return BTreeMap::new();
        }
        self.label_counts
            .iter()
            .map(|(label, count)| (label.clone(), *count as f64 / total as f64 * 100.0))
            .collect()
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.uptime.elapsed().as_secs()
    }
}
