//! ML Engine — pre-fitted preprocessing and clustering artifacts.
//!
//! The monitor never trains anything. Three opaque artifacts exported by the
//! offline training pipeline are loaded at startup and chained per window:
//!
//! ```text
//! FeatureVector -> impute -> scale -> project(2D) -> assign cluster -> label
//! ```
//!
//! - `artifacts`: capability traits ([`Transform`], [`Assign`]) and the
//!   concrete JSON-backed implementations (scaler, PCA, k-means)
//! - `inference`: the staged pipeline with per-cycle error containment

pub mod artifacts;
pub mod inference;

pub use artifacts::{
    Assign, KMeansAssigner, PcaProjection, StandardScaler, Transform,
};
pub use inference::{InferenceError, InferencePipeline};
