//! Sensor data acquisition.
//!
//! The microcontroller streams line-delimited `<encoder>,<current>` records.
//! This module validates those lines ([`line_parser`]), keeps a resilient
//! serial-bridge TCP link alive ([`sensor_client`]), and abstracts where
//! samples come from ([`source`]) so the processing loop is transport-agnostic.

pub mod line_parser;
pub mod sensor_client;
pub mod source;

pub use line_parser::{parse_line, LineError};
pub use sensor_client::{SensorClient, SensorClientStats, SensorError};
pub use source::{CsvSource, SampleEvent, SampleSource, StdinSource, TcpSource};
