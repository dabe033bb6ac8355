//! Per-sample processing: window management, feature gating, inference.

use crate::ml_engine::{InferenceError, InferencePipeline};
use crate::types::{ClassificationRecord, Sample};
use tracing::{debug, warn};

use super::features::{FeatureError, FeatureExtractor};
use super::window::SlidingWindowBuffer;

/// Processor counters, reported in the final statistics block and on the
/// dashboard.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct ProcessorStats {
    pub samples_processed: u64,
    pub classifications: u64,
    pub degenerate_windows: u64,
    pub inference_errors: u64,
}

/// Owns the sliding window and inference pipeline; classifies one sample at
/// a time.
///
/// Pure state machine: no I/O, no clock. The processing loop feeds it parsed
/// samples and handles persistence and session-state updates around it.
pub struct SampleProcessor {
    window: SlidingWindowBuffer,
    extractor: FeatureExtractor,
    inference: InferencePipeline,
    stats: ProcessorStats,
}

impl SampleProcessor {
    pub fn new(window_size: usize, feature_scale: f64, inference: InferencePipeline) -> Self {
        Self {
            window: SlidingWindowBuffer::new(window_size),
            extractor: FeatureExtractor::new(window_size, feature_scale),
            inference,
            stats: ProcessorStats::default(),
        }
    }

    /// Push one sample and classify if a full window is available.
    ///
    /// Returns a stamped record on success. Degenerate windows and inference
    /// failures skip this cycle only; the window keeps sliding and the next
    /// sample gets a fresh evaluation.
    pub fn process(&mut self, sample: Sample) -> Option<ClassificationRecord> {
        self.stats.samples_processed += 1;
        self.window.push(sample);

        if !self.window.is_full() {
            return None;
        }

        let snapshot = self.window.snapshot();
        let features = match self.extractor.extract(&snapshot) {
            Ok(f) => f,
            Err(FeatureError::DegenerateWindow { encoder_diff }) => {
                self.stats.degenerate_windows += 1;
                debug!(
                    encoder_diff = encoder_diff,
                    "Degenerate window — skipping evaluation cycle"
                );
                return None;
            }
            Err(e @ FeatureError::WrongWindowLength { .. }) => {
                // Cannot happen while the gate above holds; treat as a
                // contained evaluation failure rather than poisoning the stream.
                self.stats.inference_errors += 1;
                warn!(error = %e, "Feature extraction failed");
                return None;
            }
        };

        match self.inference.classify(&features) {
            Ok(classification) => {
                self.stats.classifications += 1;
                Some(ClassificationRecord::stamp(classification))
            }
            Err(e @ InferenceError::UnknownCluster { .. }) => {
                self.stats.inference_errors += 1;
                warn!(
                    error = %e,
                    "Cluster id not in configured label map — check artifact/config versions"
                );
                None
            }
            Err(e) => {
                self.stats.inference_errors += 1;
                warn!(error = %e, "Inference failed — skipping evaluation cycle");
                None
            }
        }
    }

    /// Current fill level of the sliding window.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn window_capacity(&self) -> usize {
        self.window.capacity()
    }

    pub fn stats(&self) -> ProcessorStats {
        self.stats
    }
}
