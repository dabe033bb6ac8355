//! Unified sample processing loop shared across all input modes.
//!
//! One record is read, fully processed (window push, optional feature
//! extraction, inference, history append), and only then is the next record
//! read. The only suspension point is "wait for next sample", which sits in
//! a select! against the cancellation token so an operator disconnect never
//! loses already-committed history.

use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::acquisition::{SampleEvent, SampleSource};
use crate::config::defaults::PROGRESS_LOG_INTERVAL;
use crate::types::MonitorStatus;

use super::processor::{ProcessorStats, SampleProcessor};
use super::state::MonitorState;

/// Owns all state needed for the unified sample processing loop.
///
/// Built with [`new()`](ProcessingLoop::new), then consumed by
/// [`run()`](ProcessingLoop::run).
pub struct ProcessingLoop {
    processor: SampleProcessor,
    session: Arc<RwLock<MonitorState>>,
    cancel_token: CancellationToken,
}

impl ProcessingLoop {
    pub fn new(
        processor: SampleProcessor,
        session: Arc<RwLock<MonitorState>>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            processor,
            session,
            cancel_token,
        }
    }

    /// Run the processing loop until the source is exhausted or cancellation.
    ///
    /// Returns final processor statistics.
    pub async fn run<S: SampleSource>(mut self, source: &mut S) -> ProcessorStats {
        info!("Processing sensor samples from {}...", source.source_name());

        loop {
            let event = tokio::select! {
                _ = self.cancel_token.cancelled() => {
                    info!("[SampleProcessor] Shutdown signal received");
                    break;
                }
                result = source.next_sample() => {
                    match result {
                        Ok(ev) => ev,
                        Err(e) => {
                            warn!("[SampleProcessor] Source error: {}", e);
                            break;
                        }
                    }
                }
            };

            let sample = match event {
                SampleEvent::Sample(s) => s,
                SampleEvent::Eof => {
                    info!(
                        "[SampleProcessor] Source reached end ({} samples processed)",
                        self.processor.stats().samples_processed
                    );
                    break;
                }
            };

            let record = self.processor.process(sample);

            {
                let mut session = self.session.write().await;
                session.record_sample(sample);
                session.status = if self.processor.window_len()
                    < self.processor.window_capacity()
                {
                    MonitorStatus::Filling
                } else {
                    MonitorStatus::Monitoring
                };

                if let Some(record) = record {
                    info!(
                        label = %record.label,
                        cluster = record.cluster_id,
                        pca1 = record.pca1,
                        pca2 = record.pca2,
                        "Condition classified"
                    );

                    // Persist before the in-memory append; a storage failure
                    // must not cost the dashboard its record.
                    if let Err(e) = crate::storage::history::store_record(&record) {
                        warn!("Failed to persist classification to history: {}", e);
                    }
                    session.append_record(record);
                }
            }

            let stats = self.processor.stats();
            if stats.samples_processed % PROGRESS_LOG_INTERVAL == 0 {
                info!(
                    "Progress: {} samples | Classifications: {} | Window: {}/{}",
                    stats.samples_processed,
                    stats.classifications,
                    self.processor.window_len(),
                    self.processor.window_capacity(),
                );
            }
        }

        // Final statistics
        let stats = self.processor.stats();
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("FINAL STATISTICS");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        info!("   Samples Processed:   {}", stats.samples_processed);
        info!("   Classifications:     {}", stats.classifications);
        info!("   Degenerate Windows:  {}", stats.degenerate_windows);
        info!("   Inference Errors:    {}", stats.inference_errors);
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        stats
    }
}
