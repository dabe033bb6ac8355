//! API route handlers
//!
//! Request handling logic for the monitoring endpoints: session status,
//! live sample echo, classification history, and label distribution.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::defaults::DEFAULT_HISTORY_LIMIT;
use crate::pipeline::MonitorState;
use crate::types::{ClassificationRecord, Sample};

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct DashboardState {
    /// Session state from the pipeline
    pub session: Arc<RwLock<MonitorState>>,
}

impl DashboardState {
    pub fn new(session: Arc<RwLock<MonitorState>>) -> Self {
        Self { session }
    }
}

// ============================================================================
// Health
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub uptime_secs: u64,
}

/// Liveness probe.
pub async fn health_check(State(state): State<DashboardState>) -> Json<HealthResponse> {
    let session = state.session.read().await;
    Json(HealthResponse {
        status: "ok",
        uptime_secs: session.uptime_secs(),
    })
}

// ============================================================================
// Status
// ============================================================================

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub equipment_id: String,
    pub status: String,
    pub samples_collected: u64,
    pub classifications: usize,
    pub last_classification_time: Option<DateTime<Utc>>,
    pub uptime_secs: u64,
}

/// Session status and counters.
pub async fn get_status(State(state): State<DashboardState>) -> Json<StatusResponse> {
    let session = state.session.read().await;
    Json(StatusResponse {
        equipment_id: session.equipment_id.clone(),
        status: session.status.to_string(),
        samples_collected: session.samples_collected,
        classifications: session.history.len(),
        last_classification_time: session.last_classification_time,
        uptime_secs: session.uptime_secs(),
    })
}

// ============================================================================
// Live samples
// ============================================================================

#[derive(Debug, Serialize)]
pub struct LatestResponse {
    pub sample: Option<Sample>,
    pub label: Option<String>,
}

/// Latest raw sample echo plus the most recent condition label.
pub async fn get_latest(State(state): State<DashboardState>) -> Json<LatestResponse> {
    let session = state.session.read().await;
    Json(LatestResponse {
        sample: session.latest_sample,
        label: session.history.last().map(|r| r.label.clone()),
    })
}

#[derive(Debug, Serialize)]
pub struct SamplesResponse {
    pub samples: Vec<Sample>,
}

/// Recent raw samples, oldest first, for the live sensor chart.
pub async fn get_samples(State(state): State<DashboardState>) -> Json<SamplesResponse> {
    let session = state.session.read().await;
    Json(SamplesResponse {
        samples: session.recent_samples.iter().copied().collect(),
    })
}

// ============================================================================
// History
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub records: Vec<ClassificationRecord>,
}

/// Classification history, newest first.
pub async fn get_history(
    State(state): State<DashboardState>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    let session = state.session.read().await;
    let records = session
        .history
        .iter()
        .rev()
        .take(limit)
        .cloned()
        .collect();
    Json(HistoryResponse { records })
}

// ============================================================================
// Distribution
// ============================================================================

#[derive(Debug, Serialize)]
pub struct DistributionResponse {
    /// Absolute classification counts per label
    pub counts: BTreeMap<String, u64>,
    /// Percentage share per label
    pub percentages: BTreeMap<String, f64>,
}

/// Per-label classification shares for the condition distribution display.
pub async fn get_distribution(State(state): State<DashboardState>) -> Json<DistributionResponse> {
    let session = state.session.read().await;
    Json(DistributionResponse {
        counts: session.label_counts.clone(),
        percentages: session.label_distribution(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Classification;

    fn state_with_history(n: usize) -> DashboardState {
        let mut session = MonitorState::default();
        for i in 0..n {
            session.append_record(ClassificationRecord::stamp(Classification {
                pca1: i as f64,
                pca2: 0.0,
                cluster_id: i % 2,
                label: if i % 2 == 0 { "Clogged" } else { "Unclogged" }.to_string(),
            }));
        }
        DashboardState::new(Arc::new(RwLock::new(session)))
    }

    #[tokio::test]
    async fn test_history_newest_first_with_limit() {
        let state = state_with_history(10);
        let Json(response) = get_history(
            State(state),
            Query(HistoryQuery { limit: Some(3) }),
        )
        .await;
        let pca1s: Vec<f64> = response.records.iter().map(|r| r.pca1).collect();
        assert_eq!(pca1s, vec![9.0, 8.0, 7.0]);
    }

    #[tokio::test]
    async fn test_distribution_counts() {
        let state = state_with_history(4);
        let Json(response) = get_distribution(State(state)).await;
        assert_eq!(response.counts["Clogged"], 2);
        assert_eq!(response.counts["Unclogged"], 2);
        assert!((response.percentages["Clogged"] - 50.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_status_reflects_session() {
        let state = state_with_history(2);
        let Json(response) = get_status(State(state)).await;
        assert_eq!(response.classifications, 2);
        assert_eq!(response.status, "Initializing");
    }
}
