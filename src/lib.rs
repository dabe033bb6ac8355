//! NOZZLE-SENTINEL: Real-Time Nozzle Condition Monitoring
//!
//! Streaming pipeline for classifying extrusion nozzle state from paired
//! encoder/current sensor readings.
//!
//! ## Architecture
//!
//! - **Acquisition**: line-delimited `<encoder>,<current>` records from
//!   stdin, a serial-over-TCP bridge, or a capture file
//! - **Pipeline**: sliding window, feature derivation, per-cycle error
//!   containment
//! - **ML Engine**: pre-fitted scaler → PCA → k-means inference chain
//! - **Storage**: sled-backed classification history
//! - **API**: axum JSON endpoints for any reporting layer

pub mod acquisition;
pub mod api;
pub mod config;
pub mod ml_engine;
pub mod pipeline;
pub mod storage;
pub mod types;

// Re-export monitor configuration
pub use config::MonitorConfig;

// Re-export commonly used types
pub use types::{
    Classification, ClassificationRecord, FeatureVector, MonitorStatus, Sample,
};

// Re-export pipeline components
pub use pipeline::{
    FeatureError, FeatureExtractor, MonitorState, ProcessingLoop, SampleProcessor,
    SlidingWindowBuffer,
};

// Re-export ML engine components
pub use ml_engine::{
    Assign, InferenceError, InferencePipeline, KMeansAssigner, PcaProjection,
    StandardScaler, Transform,
};

// Re-export acquisition components
pub use acquisition::{
    parse_line, CsvSource, LineError, SampleEvent, SampleSource, SensorClient,
    SensorError, StdinSource, TcpSource,
};
