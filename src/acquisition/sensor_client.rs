//! Serial-bridge TCP client.
//!
//! The microcontroller is attached to a serial port exposed over TCP by a
//! bridge (ser2net, socat, or an ESP-side network stack). This client owns
//! the link: line-oriented reads with a bounded timeout, reconnection with
//! exponential backoff, stale-connection detection, and health statistics.
//!
//! Timeouts are recoverable non-events: no data within the read timeout
//! triggers a reconnect, never stream termination.

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

/// Transport errors for the sensor link
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Timeout waiting for data")]
    Timeout,

    #[error("Connection closed")]
    ConnectionClosed,
}

/// Maximum reconnection attempts before giving up.
const MAX_RECONNECT_ATTEMPTS: u32 = 10;

/// Initial reconnection delay (doubles each attempt).
const INITIAL_RECONNECT_DELAY_SECS: u64 = 2;

/// Maximum reconnection delay cap (seconds).
const MAX_RECONNECT_DELAY_SECS: u64 = 60;

/// Stale connection timeout — if no data for this long, force reconnect.
const STALE_CONNECTION_SECS: u64 = 120;

/// Line-oriented sensor TCP client with reconnection and timeout resilience
pub struct SensorClient {
    host: String,
    port: u16,
    stream: Option<BufReader<TcpStream>>,
    connected: bool,
    line_buffer: String,
    /// Read timeout per line (seconds)
    read_timeout_secs: u64,
    /// Connect timeout (seconds)
    connect_timeout_secs: u64,
    /// Timestamp of last successful data receipt (Unix secs)
    last_data_time: u64,
    /// Consecutive reconnection attempts (resets on success)
    reconnect_attempts: u32,
    /// Total lines received since creation
    lines_received: u64,
    /// Total reconnections performed
    reconnections: u64,
    /// Total timeouts encountered
    timeouts: u64,
}

impl SensorClient {
    /// Create new sensor client with default settings
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            stream: None,
            connected: false,
            line_buffer: String::with_capacity(128),
            read_timeout_secs: crate::config::defaults::READ_TIMEOUT_SECS,
            connect_timeout_secs: crate::config::defaults::CONNECT_TIMEOUT_SECS,
            last_data_time: 0,
            reconnect_attempts: 0,
            lines_received: 0,
            reconnections: 0,
            timeouts: 0,
        }
    }

    /// Set the per-line read timeout (seconds).
    pub fn with_read_timeout(mut self, secs: u64) -> Self {
        self.read_timeout_secs = secs;
        self
    }

    /// Set the connect timeout (seconds).
    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    /// Connect to the serial bridge with timeout
    pub async fn connect(&mut self) -> Result<(), SensorError> {
        if self.connected {
            return Ok(());
        }

        let addr = format!("{}:{}", self.host, self.port);
        tracing::info!(address = %addr, "Connecting to sensor bridge");

        let connect_timeout = tokio::time::Duration::from_secs(self.connect_timeout_secs);
        let stream = tokio::time::timeout(connect_timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| SensorError::Timeout)?
            .map_err(|e| SensorError::ConnectionFailed(e.to_string()))?;

        // Enable TCP keepalive to detect dead connections
        let sock_ref = socket2::SockRef::from(&stream);
        let keepalive = socket2::TcpKeepalive::new()
            .with_time(std::time::Duration::from_secs(30))
            .with_interval(std::time::Duration::from_secs(10));
        let _ = sock_ref.set_tcp_keepalive(&keepalive);

        self.stream = Some(BufReader::new(stream));
        self.connected = true;
        self.last_data_time = current_unix_secs();
        self.reconnect_attempts = 0;

        tracing::info!("Sensor bridge connection established");
        Ok(())
    }

    /// Disconnect from the bridge
    pub async fn disconnect(&mut self) -> Result<(), SensorError> {
        if let Some(ref mut reader) = self.stream {
            let _ = reader.get_mut().shutdown().await;
        }
        self.stream = None;
        self.connected = false;
        tracing::info!("Sensor bridge connection closed");
        Ok(())
    }

    /// Reconnect with exponential backoff.
    ///
    /// Returns Ok(()) when reconnected, Err if max attempts exhausted.
    pub async fn reconnect(&mut self) -> Result<(), SensorError> {
        let _ = self.disconnect().await;

        for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
            self.reconnect_attempts = attempt;

            let delay_secs = (INITIAL_RECONNECT_DELAY_SECS * 2u64.saturating_pow(attempt - 1))
                .min(MAX_RECONNECT_DELAY_SECS);

            tracing::warn!(
                attempt = attempt,
                max_attempts = MAX_RECONNECT_ATTEMPTS,
                delay_secs = delay_secs,
                "Sensor bridge reconnecting after failure"
            );

            tokio::time::sleep(tokio::time::Duration::from_secs(delay_secs)).await;

            match self.connect().await {
                Ok(()) => {
                    self.reconnections += 1;
                    tracing::info!(
                        attempt = attempt,
                        total_reconnections = self.reconnections,
                        "Sensor bridge reconnection successful"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(attempt = attempt, error = %e, "Reconnection attempt failed");
                }
            }
        }

        tracing::error!(
            max_attempts = MAX_RECONNECT_ATTEMPTS,
            "Sensor bridge reconnection exhausted — all attempts failed"
        );
        Err(SensorError::ConnectionFailed(format!(
            "Failed to reconnect after {} attempts",
            MAX_RECONNECT_ATTEMPTS
        )))
    }

    /// Read the next non-empty line with timeout and stale detection.
    ///
    /// Automatically reconnects on timeout or connection drop. The returned
    /// line is trimmed but otherwise raw — validation happens downstream.
    pub async fn read_line(&mut self) -> Result<String, SensorError> {
        // Check for stale connection
        let now = current_unix_secs();
        if self.connected
            && self.last_data_time > 0
            && (now - self.last_data_time) > STALE_CONNECTION_SECS
        {
            tracing::warn!(
                silent_secs = now - self.last_data_time,
                threshold = STALE_CONNECTION_SECS,
                "Sensor link stale — no data received, forcing reconnect"
            );
            self.reconnect().await?;
        }

        // Ensure connected
        if !self.connected {
            self.connect().await?;
        }

        match self.read_line_inner().await {
            Ok(line) => {
                self.last_data_time = current_unix_secs();
                self.lines_received += 1;
                self.reconnect_attempts = 0;
                Ok(line)
            }
            Err(SensorError::Timeout) => {
                self.timeouts += 1;
                tracing::warn!(
                    timeout_secs = self.read_timeout_secs,
                    total_timeouts = self.timeouts,
                    "Sensor read timeout — attempting reconnect"
                );
                self.reconnect().await?;
                // Try one more read after reconnect
                self.read_line_inner().await
            }
            Err(SensorError::ConnectionClosed) => {
                tracing::warn!("Sensor link closed by bridge — attempting reconnect");
                self.reconnect().await?;
                self.read_line_inner().await
            }
            Err(e) => Err(e),
        }
    }

    /// Inner line read with timeout — does NOT auto-reconnect.
    async fn read_line_inner(&mut self) -> Result<String, SensorError> {
        let reader = self
            .stream
            .as_mut()
            .ok_or_else(|| SensorError::ConnectionFailed("Not connected".to_string()))?;

        let read_timeout = tokio::time::Duration::from_secs(self.read_timeout_secs);

        loop {
            self.line_buffer.clear();

            let read_result =
                tokio::time::timeout(read_timeout, reader.read_line(&mut self.line_buffer)).await;

            let bytes = match read_result {
                Ok(Ok(b)) => b,
                Ok(Err(e)) => return Err(SensorError::ConnectionFailed(e.to_string())),
                Err(_) => return Err(SensorError::Timeout),
            };

            if bytes == 0 {
                return Err(SensorError::ConnectionClosed);
            }

            let line = self.line_buffer.trim();
            if line.is_empty() {
                // Keep-alive or blank line between records
                continue;
            }

            return Ok(line.to_string());
        }
    }

    /// Get connection health statistics
    pub fn stats(&self) -> SensorClientStats {
        SensorClientStats {
            connected: self.connected,
            lines_received: self.lines_received,
            reconnections: self.reconnections,
            timeouts: self.timeouts,
            last_data_secs_ago: if self.last_data_time > 0 {
                current_unix_secs().saturating_sub(self.last_data_time)
            } else {
                0
            },
        }
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Sensor link health statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct SensorClientStats {
    pub connected: bool,
    pub lines_received: u64,
    pub reconnections: u64,
    pub timeouts: u64,
    pub last_data_secs_ago: u64,
}

/// Get current Unix timestamp in seconds
fn current_unix_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_client_starts_disconnected() {
        let client = SensorClient::new("localhost", 5000);
        assert!(!client.is_connected());
        let stats = client.stats();
        assert_eq!(stats.lines_received, 0);
        assert_eq!(stats.reconnections, 0);
    }

    #[tokio::test]
    async fn test_reads_lines_from_bridge() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"100.0,0.5\n\n200.0,0.6\n").await.unwrap();
            // Keep the socket open long enough for both reads
            tokio::time::sleep(tokio::time::Duration::from_millis(200)).await;
        });

        let mut client = SensorClient::new(&addr.ip().to_string(), addr.port());
        client.connect().await.unwrap();

        // Blank line between the two records is skipped transparently
        assert_eq!(client.read_line().await.unwrap(), "100.0,0.5");
        assert_eq!(client.read_line().await.unwrap(), "200.0,0.6");
        assert_eq!(client.stats().lines_received, 2);
    }
}
