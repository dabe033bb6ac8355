//! Pipeline Integration Tests
//!
//! Exercises the full stream path — source, parser, window, features,
//! inference, history — with identity artifacts so assertions are exact.
//! Asserts on window gating, degenerate-window skips, malformed-line
//! containment, and classification determinism.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use nozzle_sentinel::acquisition::{CsvSource, SampleEvent, SampleSource};
use nozzle_sentinel::ml_engine::{
    InferencePipeline, KMeansAssigner, PcaProjection, StandardScaler,
};
use nozzle_sentinel::pipeline::{MonitorState, ProcessingLoop, SampleProcessor};
use nozzle_sentinel::types::{FEATURE_COUNT, REDUCED_DIMENSIONS};

const WINDOW: usize = 200;
const FEATURE_SCALE: f64 = 1000.0;

/// Identity artifact chain: scaler passes through, the projection keeps the
/// first two features, and a single zero centroid always assigns cluster 0.
fn identity_inference() -> InferencePipeline {
    InferencePipeline::new(
        Box::new(StandardScaler::identity(FEATURE_COUNT)),
        Box::new(PcaProjection::identity_truncate(
            FEATURE_COUNT,
            REDUCED_DIMENSIONS,
        )),
        Box::new(KMeansAssigner::constant(REDUCED_DIMENSIONS)),
        BTreeMap::from([(0, "Clogged".to_string()), (1, "Unclogged".to_string())]),
        0.0,
    )
}

fn processor() -> SampleProcessor {
    SampleProcessor::new(WINDOW, FEATURE_SCALE, identity_inference())
}

/// `count` well-formed lines with advancing encoder and constant current.
fn advancing_lines(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{}.0,0.5", i)).collect()
}

/// Run a CsvSource through the full processing loop and return the session.
async fn run_loop(lines: Vec<String>) -> MonitorState {
    let session = Arc::new(RwLock::new(MonitorState::default()));
    let mut source = CsvSource::new(lines, 0);
    let processing_loop = ProcessingLoop::new(
        processor(),
        Arc::clone(&session),
        CancellationToken::new(),
    );
    processing_loop.run(&mut source).await;
    let state = session.read().await;
    state.clone()
}

#[tokio::test]
async fn test_no_classification_until_window_fills() {
    let session = run_loop(advancing_lines(199)).await;
    assert_eq!(session.samples_collected, 199);
    assert!(session.history.is_empty());
}

#[tokio::test]
async fn test_exactly_one_record_at_first_full_window() {
    let session = run_loop(advancing_lines(200)).await;
    assert_eq!(session.samples_collected, 200);
    assert_eq!(session.history.len(), 1);
    assert_eq!(session.history[0].label, "Clogged");
}

#[tokio::test]
async fn test_stalled_encoder_raises_degenerate_signal() {
    let lines: Vec<String> = (0..200).map(|_| "500.0,0.5".to_string()).collect();
    let session = run_loop(lines).await;
    assert_eq!(session.samples_collected, 200);
    assert!(session.history.is_empty(), "degenerate window must not classify");
}

#[tokio::test]
async fn test_malformed_lines_skip_without_touching_buffer() {
    // 199 valid samples, then one of each malformed shape, then the 200th
    // valid sample. The invalid lines must neither enter the window nor
    // derail the stream — the very next valid line completes the window.
    let mut lines = advancing_lines(199);
    lines.push("abc,1.2".to_string()); // ParseError
    lines.push("1.0".to_string()); // FormatError
    lines.push("199.0,0.5".to_string());

    let session = run_loop(lines).await;
    assert_eq!(session.samples_collected, 200);
    assert_eq!(session.history.len(), 1);
}

#[tokio::test]
async fn test_history_grows_once_per_sample_after_full() {
    let session = run_loop(advancing_lines(210)).await;
    assert_eq!(session.history.len(), 11);
    // Records in arrival order
    for pair in session.history.windows(2) {
        assert!(pair[0].timestamp <= pair[1].timestamp);
    }
}

#[tokio::test]
async fn test_identity_artifacts_are_deterministic_across_runs() {
    let first = run_loop(advancing_lines(200)).await;
    let second = run_loop(advancing_lines(200)).await;

    let a = &first.history[0];
    let b = &second.history[0];
    assert_eq!(a.pca1, b.pca1);
    assert_eq!(a.pca2, b.pca2);
    assert_eq!(a.cluster_id, b.cluster_id);
    assert_eq!(a.label, "Clogged");

    // With identity artifacts the coordinates are the raw first two features:
    // constant 0.5 A over 199 counts of travel, zero variance.
    let expected_pca1 = (0.5 / 199.0) * FEATURE_SCALE;
    assert!((a.pca1 - expected_pca1).abs() < 1e-9);
    assert!(a.pca2.abs() < 1e-12);
}

#[tokio::test]
async fn test_source_reports_eof_after_lines_are_drained() {
    let mut source = CsvSource::new(advancing_lines(3), 0);
    for _ in 0..3 {
        assert!(matches!(
            source.next_sample().await.unwrap(),
            SampleEvent::Sample(_)
        ));
    }
    assert!(matches!(
        source.next_sample().await.unwrap(),
        SampleEvent::Eof
    ));
}

#[tokio::test]
async fn test_cancellation_stops_loop_and_keeps_history() {
    let session = Arc::new(RwLock::new(MonitorState::default()));
    let cancel = CancellationToken::new();

    // Slow source so cancellation lands mid-stream, after the first record
    let lines = advancing_lines(5000);
    let mut source = CsvSource::new(lines, 1);
    let processing_loop =
        ProcessingLoop::new(processor(), Arc::clone(&session), cancel.clone());

    let handle = tokio::spawn(async move { processing_loop.run(&mut source).await });

    // Let the window fill (200 samples at ~1ms pacing), then disconnect
    tokio::time::sleep(tokio::time::Duration::from_millis(600)).await;
    cancel.cancel();
    let stats = handle.await.unwrap();

    let state = session.read().await;
    assert!(stats.samples_processed < 5000, "loop must stop early");
    assert_eq!(
        state.history.len() as u64,
        stats.classifications,
        "committed history must survive cancellation"
    );
}
