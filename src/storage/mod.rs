//! Persistent storage for the classification history.
//!
//! Sled-backed, timestamp-keyed. Persistence failures degrade to warnings —
//! the in-memory session history remains authoritative for the stream.

pub mod history;

pub use history::{StorageError, StorageStats};
