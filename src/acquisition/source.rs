//! Sample source abstraction for sensor ingestion.
//!
//! Provides a unified trait for reading sensor samples from different
//! transports: stdin (piped serial dump or simulator), TCP (serial bridge),
//! and capture files (replay).

use crate::types::Sample;
use anyhow::Result;
use async_trait::async_trait;

use super::line_parser::{self, LineError};
use super::sensor_client::{SensorClient, SensorError};

/// Events produced by a sample source.
pub enum SampleEvent {
    /// A valid sensor sample was read.
    Sample(Sample),
    /// Source reached end of data (EOF for files/stdin, permanent disconnect for TCP).
    Eof,
}

/// Trait abstracting where sensor samples come from.
///
/// Implementations handle line parsing, reconnection, and pacing internally.
/// Malformed lines are reported and skipped inside the source — they never
/// surface as errors to the processing loop. The loop calls
/// [`next_sample`](SampleSource::next_sample) in a select! with cancellation.
#[async_trait]
pub trait SampleSource: Send + 'static {
    /// Read the next sample from the source.
    ///
    /// Returns `SampleEvent::Eof` when no more data is available.
    /// Returns `Err` on unrecoverable errors (e.g. failed reconnection).
    async fn next_sample(&mut self) -> Result<SampleEvent>;

    /// Human-readable name for logging (e.g. "capture", "stdin", "sensor-tcp").
    fn source_name(&self) -> &str;
}

/// Log a rejected line at the level the error taxonomy assigns it.
fn report_skipped(source: &str, err: &LineError) {
    match err {
        LineError::Format { .. } => {
            tracing::warn!("[{}] Skipped line with invalid format: {:?}", source, err.line());
        }
        LineError::Parse { .. } => {
            tracing::warn!("[{}] Skipped line with invalid number: {:?}", source, err.line());
        }
    }
}

// ============================================================================
// Stdin Source (line-delimited records, one per line)
// ============================================================================

/// Reads `<encoder>,<current>` lines from stdin.
///
/// Used with the simulator harness:
/// `sensor-sim | nozzle-sentinel --stdin`
pub struct StdinSource {
    reader: tokio::io::BufReader<tokio::io::Stdin>,
    line_buffer: String,
}

impl StdinSource {
    pub fn new() -> Self {
        Self {
            reader: tokio::io::BufReader::new(tokio::io::stdin()),
            line_buffer: String::with_capacity(128),
        }
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SampleSource for StdinSource {
    async fn next_sample(&mut self) -> Result<SampleEvent> {
        use tokio::io::AsyncBufReadExt;
        loop {
            self.line_buffer.clear();
            let bytes = self.reader.read_line(&mut self.line_buffer).await?;
            if bytes == 0 {
                return Ok(SampleEvent::Eof);
            }
            let line = self.line_buffer.trim();
            if line.is_empty() {
                continue;
            }
            match line_parser::parse_line(line) {
                Ok(sample) => return Ok(SampleEvent::Sample(sample)),
                Err(e) => report_skipped("StdinSource", &e),
            }
        }
    }

    fn source_name(&self) -> &str {
        "stdin"
    }
}

// ============================================================================
// TCP Source (serial bridge)
// ============================================================================

/// Reads sensor records from a serial-over-TCP bridge.
///
/// Wraps [`SensorClient`] which handles reconnection and timeouts internally.
pub struct TcpSource {
    client: SensorClient,
}

impl TcpSource {
    /// Connect to a sensor bridge and return a ready source.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let acq = &crate::config::get().acquisition;
        let mut client = SensorClient::new(host, port)
            .with_read_timeout(acq.read_timeout_secs)
            .with_connect_timeout(acq.connect_timeout_secs);
        client.connect().await.map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(Self { client })
    }

    /// Connection health statistics for the dashboard.
    pub fn stats(&self) -> super::SensorClientStats {
        self.client.stats()
    }
}

#[async_trait]
impl SampleSource for TcpSource {
    async fn next_sample(&mut self) -> Result<SampleEvent> {
        // SensorClient::read_line() handles reconnection internally.
        // If it returns an error, reconnection has already been exhausted.
        loop {
            match self.client.read_line().await {
                Ok(line) => match line_parser::parse_line(&line) {
                    Ok(sample) => return Ok(SampleEvent::Sample(sample)),
                    Err(e) => report_skipped("TcpSource", &e),
                },
                Err(SensorError::ConnectionClosed) => return Ok(SampleEvent::Eof),
                Err(e) => return Err(anyhow::anyhow!("Sensor TCP error: {}", e)),
            }
        }
    }

    fn source_name(&self) -> &str {
        "sensor-tcp"
    }
}

// ============================================================================
// CSV Source (capture replay)
// ============================================================================

/// Replays captured sensor lines with optional inter-sample delay.
pub struct CsvSource {
    lines: std::vec::IntoIter<String>,
    delay_ms: u64,
    yielded_first: bool,
}

impl CsvSource {
    /// Load a capture file: one `<encoder>,<current>` record per line.
    pub fn load(path: &std::path::Path, delay_ms: u64) -> Result<Self> {
        use anyhow::Context;
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read capture file {}", path.display()))?;
        let lines: Vec<String> = contents
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        if lines.is_empty() {
            anyhow::bail!("No sensor records in capture file {}", path.display());
        }
        Ok(Self::new(lines, delay_ms))
    }

    pub fn new(lines: Vec<String>, delay_ms: u64) -> Self {
        Self {
            lines: lines.into_iter(),
            delay_ms,
            yielded_first: false,
        }
    }
}

#[async_trait]
impl SampleSource for CsvSource {
    async fn next_sample(&mut self) -> Result<SampleEvent> {
        loop {
            // Delay between samples (skip delay before the first sample).
            if self.yielded_first && self.delay_ms > 0 {
                tokio::time::sleep(tokio::time::Duration::from_millis(self.delay_ms)).await;
            }
            let Some(line) = self.lines.next() else {
                return Ok(SampleEvent::Eof);
            };
            self.yielded_first = true;
            match line_parser::parse_line(&line) {
                Ok(sample) => return Ok(SampleEvent::Sample(sample)),
                Err(e) => report_skipped("CsvSource", &e),
            }
        }
    }

    fn source_name(&self) -> &str {
        "capture"
    }
}
