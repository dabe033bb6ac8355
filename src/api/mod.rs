//! REST API module using Axum
//!
//! Exposes the monitoring session to any reporting/visualization layer:
//! - `/health` — liveness probe
//! - `/api/status` — session status, counters, uptime
//! - `/api/latest` — latest raw sample echo for live metrics
//! - `/api/samples` — recent raw samples for the live sensor chart
//! - `/api/history` — classification records (newest first)
//! - `/api/distribution` — per-label classification shares
//!
//! Rendering is a client concern; this module serves JSON only.

pub mod handlers;

pub use handlers::DashboardState;

use axum::http::{header, Method};
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build a CORS layer that is restrictive by default (same-origin only).
///
/// Set `NOZZLE_CORS_ORIGINS` to a comma-separated list of allowed origins
/// for development (e.g., a local chart frontend's dev server).
fn build_cors_layer() -> CorsLayer {
    match std::env::var("NOZZLE_CORS_ORIGINS") {
        Ok(origins) => {
            let allowed: Vec<axum::http::HeaderValue> = origins
                .split(',')
                .filter_map(|o| o.trim().parse().ok())
                .collect();
            tracing::info!(origins = %origins, "CORS: allowing configured origins");
            CorsLayer::new()
                .allow_origin(allowed)
                .allow_methods([Method::GET])
                .allow_headers([header::CONTENT_TYPE])
        }
        Err(_) => CorsLayer::new()
            .allow_methods([Method::GET])
            .allow_headers([header::CONTENT_TYPE]),
    }
}

/// Create the complete application router.
pub fn create_app(state: DashboardState) -> Router {
    let cors = build_cors_layer();

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/status", get(handlers::get_status))
        .route("/api/latest", get(handlers::get_latest))
        .route("/api/samples", get(handlers::get_samples))
        .route("/api/history", get(handlers::get_history))
        .route("/api/distribution", get(handlers::get_distribution))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
