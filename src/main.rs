//! NOZZLE-SENTINEL - Real-Time Nozzle Condition Monitoring
//!
//! Classifies extrusion nozzle state (Clogged / Unclogged) from a streaming
//! pair of sensor readings using pre-fitted clustering artifacts.
//!
//! # Usage
//!
//! ```bash
//! # Pipe records from the simulator
//! sensor-sim --regime unclogged | nozzle-sentinel --stdin
//!
//! # Connect to a serial-over-TCP bridge (ser2net / socat)
//! nozzle-sentinel --tcp localhost:5000
//!
//! # Replay a capture file at 10x speed
//! nozzle-sentinel --csv capture.csv --speed 10
//! ```
//!
//! # Environment Variables
//!
//! - `NOZZLE_CONFIG`: Path to monitor_config.toml (default: ./monitor_config.toml)
//! - `NOZZLE_CORS_ORIGINS`: Allowed dashboard origins (default: same-origin)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use nozzle_sentinel::acquisition::{CsvSource, SampleSource, StdinSource, TcpSource};
use nozzle_sentinel::api::{create_app, DashboardState};
use nozzle_sentinel::config::{self, defaults, MonitorConfig};
use nozzle_sentinel::ml_engine::{
    InferencePipeline, KMeansAssigner, PcaProjection, StandardScaler,
};
use nozzle_sentinel::pipeline::{MonitorState, ProcessingLoop, SampleProcessor};
use nozzle_sentinel::storage;
use nozzle_sentinel::types::REDUCED_DIMENSIONS;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "nozzle-sentinel")]
#[command(about = "Real-time nozzle condition monitoring")]
#[command(version)]
struct CliArgs {
    /// Read sensor records from stdin
    /// Use with the simulator: sensor-sim | nozzle-sentinel --stdin
    #[arg(long)]
    stdin: bool,

    /// Connect to a serial-over-TCP bridge (ser2net/socat)
    /// Example: nozzle-sentinel --tcp localhost:5000
    #[arg(long, value_name = "HOST:PORT")]
    tcp: Option<String>,

    /// Replay a capture file (one <encoder>,<current> record per line)
    #[arg(long)]
    csv: Option<String>,

    /// Replay speed multiplier (1 = nominal rate, 0 = no delay)
    #[arg(long, default_value = "1")]
    speed: u64,

    /// Override the dashboard server address (default from config)
    #[arg(short, long)]
    addr: Option<String>,
}

// ============================================================================
// Task Names for Supervisor Logging
// ============================================================================

#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    SampleProcessor,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::SampleProcessor => write!(f, "SampleProcessor"),
        }
    }
}

// ============================================================================
// Startup
// ============================================================================

/// Path of the persistent classification history database.
const HISTORY_DB_PATH: &str = "./data/classification_history.db";

/// Load the three pre-fitted artifacts and assemble the inference pipeline.
///
/// Missing or corrupt artifacts abort startup — a monitor without a complete
/// artifact set would silently misclassify, so there is no degraded mode.
fn load_inference(cfg: &MonitorConfig) -> Result<InferencePipeline> {
    let scaler = StandardScaler::load(&cfg.artifacts.scaler)
        .context("Scaler artifact failed to load — cannot start")?;
    info!("✓ Scaler artifact loaded from {}", cfg.artifacts.scaler.display());

    let reducer = PcaProjection::load(&cfg.artifacts.reducer)
        .context("Projection artifact failed to load — cannot start")?;
    if reducer.output_dimensions() != REDUCED_DIMENSIONS {
        anyhow::bail!(
            "Projection artifact outputs {} dimensions, expected {}",
            reducer.output_dimensions(),
            REDUCED_DIMENSIONS
        );
    }
    info!("✓ Projection artifact loaded from {}", cfg.artifacts.reducer.display());

    let assigner = KMeansAssigner::load(&cfg.artifacts.assigner)
        .context("Assigner artifact failed to load — cannot start")?;
    info!("✓ Assigner artifact loaded from {}", cfg.artifacts.assigner.display());

    let labels = cfg.labels.to_map();
    info!(
        "✓ Condition labels: {}",
        labels
            .iter()
            .map(|(id, label)| format!("{} => {}", id, label))
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(InferencePipeline::new(
        Box::new(scaler),
        Box::new(reducer),
        Box::new(assigner),
        labels,
        cfg.features.impute_fallback,
    ))
}

/// Spawn the HTTP server task into the JoinSet.
fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: axum::Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

/// Run the supervisor loop: monitor tasks, cancel on failure.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("Supervisor: all tasks spawned, monitoring...");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Supervisor: shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        info!("Supervisor: task {} completed normally", task_name);
                    }
                    Some(Ok(Err(e))) => {
                        error!("Supervisor: task failed with error: {}", e);
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("Supervisor: task panicked: {}", e);
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("Supervisor: all tasks completed");
                        break;
                    }
                }
            }
        }
    }

    Ok(())
}

// ============================================================================
// Unified Pipeline Runner
// ============================================================================

/// Run the monitoring pipeline with any sample source.
///
/// All input modes (stdin, TCP, capture replay) flow through this function.
async fn run_pipeline<S: SampleSource>(
    mut source: S,
    server_addr: String,
    cancel_token: CancellationToken,
) -> Result<()> {
    let cfg = config::get();

    let session = Arc::new(RwLock::new(MonitorState::from_config()));
    info!("✓ Session state initialized");

    if let Err(e) = storage::history::init(HISTORY_DB_PATH) {
        warn!(
            "Failed to initialize history storage: {}. Classifications will not be persisted.",
            e
        );
    } else {
        info!("✓ Classification history storage initialized");
    }

    let inference = load_inference(cfg)?;
    let processor = SampleProcessor::new(cfg.window.size, cfg.features.scale, inference);
    info!(
        "✓ Pipeline ready (window: {} samples, feature scale: {})",
        cfg.window.size, cfg.features.scale
    );

    info!("Starting dashboard server on {}...", server_addr);
    let dashboard_state = DashboardState::new(Arc::clone(&session));
    let app = create_app(dashboard_state);
    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", server_addr))?;
    info!("✓ Dashboard API listening on {}", server_addr);

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    // Task 1: HTTP Server
    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());

    // Task 2: Sample Processor (unified processing loop)
    let proc_cancel = cancel_token.clone();
    let proc_session = Arc::clone(&session);
    task_set.spawn(async move {
        info!("[SampleProcessor] Task starting");
        let processing_loop = ProcessingLoop::new(processor, proc_session, proc_cancel);
        let _stats = processing_loop.run(&mut source).await;
        Ok(TaskName::SampleProcessor)
    });

    run_supervisor(&mut task_set, cancel_token).await
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    // Load monitor configuration
    let monitor_config = MonitorConfig::load();
    info!(
        "Equipment: {} | Window: {} samples",
        monitor_config.monitor.equipment_id, monitor_config.window.size
    );
    let server_addr = args
        .addr
        .unwrap_or_else(|| monitor_config.server.addr.clone());
    config::init(monitor_config);

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  NOZZLE-SENTINEL");
    info!("  Real-Time Nozzle Condition Monitoring");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    // Dispatch to unified pipeline with the appropriate source
    if let Some(addr) = args.tcp {
        // --- TCP mode (serial bridge) ---
        let (host, port) = addr
            .split_once(':')
            .context("Invalid bridge address format. Expected HOST:PORT")?;
        let port: u16 = port.parse().context("Invalid port number")?;

        info!("Input: serial bridge at {}", addr);
        let source = TcpSource::connect(host, port).await?;
        run_pipeline(source, server_addr, cancel_token).await?;
    } else if args.stdin {
        // --- Stdin mode ---
        info!("Input: stdin (piped sensor records)");
        run_pipeline(StdinSource::new(), server_addr, cancel_token).await?;
    } else if let Some(csv) = args.csv {
        // --- Capture replay mode ---
        let delay_ms = if args.speed == 0 {
            0
        } else {
            defaults::REPLAY_BASE_DELAY_MS / args.speed
        };
        info!(
            "Input: capture replay from {} ({}ms delay between samples)",
            csv, delay_ms
        );
        let source = CsvSource::load(std::path::Path::new(&csv), delay_ms)?;
        run_pipeline(source, server_addr, cancel_token).await?;
    } else {
        anyhow::bail!("No input selected. Use --stdin, --tcp HOST:PORT, or --csv FILE");
    }

    info!("");
    info!("✓ NOZZLE-SENTINEL shutdown complete");
    Ok(())
}
