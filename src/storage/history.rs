//! Classification History Storage
//!
//! Persists ClassificationRecords to Sled DB so history survives restarts
//! and can be served to the dashboard. Uses timestamp-based keys for natural
//! chronological ordering.

use crate::types::ClassificationRecord;
use std::path::Path;
use std::sync::{Arc, OnceLock};

/// Global database instance for the history storage
static HISTORY_DB: OnceLock<Arc<sled::Db>> = OnceLock::new();

/// Error type for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Storage not initialized")]
    NotInitialized,
}

impl From<sled::Error> for StorageError {
    fn from(err: sled::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Storage size and count statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct StorageStats {
    pub records: usize,
    pub size_bytes: u64,
}

/// Open (or create) the history database at the given path.
///
/// Call once at startup before the processing loop runs. Subsequent calls
/// are ignored.
pub fn init<P: AsRef<Path>>(path: P) -> Result<(), StorageError> {
    if HISTORY_DB.get().is_some() {
        return Ok(());
    }
    let db = sled::open(path)?;
    let _ = HISTORY_DB.set(Arc::new(db));
    Ok(())
}

fn db() -> Result<&'static Arc<sled::Db>, StorageError> {
    HISTORY_DB.get().ok_or(StorageError::NotInitialized)
}

/// Store one classification record.
///
/// Key: record timestamp as microseconds, u64 big-endian bytes (sorts
/// chronologically). Value: JSON-serialized record.
///
/// Does not call flush() on each write; sled provides durability via
/// background flushing. On crash, at most the last few records may be lost
/// (acceptable — the stream regenerates one record per sample).
pub fn store_record(record: &ClassificationRecord) -> Result<(), StorageError> {
    let micros = record.timestamp.timestamp_micros().max(0) as u64;
    let key = micros.to_be_bytes();
    let value = serde_json::to_vec(record)?;
    db()?.insert(key, value)?;
    Ok(())
}

/// Get the most recent N records (newest first).
pub fn recent(limit: usize) -> Vec<ClassificationRecord> {
    let Ok(db) = db() else {
        return Vec::new();
    };

    let mut records = Vec::with_capacity(limit);
    for item in db.iter().rev() {
        if records.len() >= limit {
            break;
        }
        if let Ok((_key, value)) = item {
            if let Ok(record) = serde_json::from_slice::<ClassificationRecord>(&value) {
                records.push(record);
            }
        }
    }
    records
}

/// Storage statistics for the dashboard.
pub fn stats() -> Result<StorageStats, StorageError> {
    let db = db()?;
    Ok(StorageStats {
        records: db.len(),
        size_bytes: db.size_on_disk().unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Classification;

    /// init() binds a process-global; exercise the whole surface in one test
    /// to keep the database path deterministic.
    #[test]
    fn test_store_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        init(dir.path().join("history.db")).unwrap();

        for i in 0..5i64 {
            let mut record = ClassificationRecord::stamp(Classification {
                pca1: i as f64,
                pca2: 0.0,
                cluster_id: 0,
                label: "Clogged".to_string(),
            });
            // Distinct timestamps so each record gets its own key
            record.timestamp = record.timestamp + chrono::Duration::milliseconds(i);
            store_record(&record).unwrap();
        }

        let recent_two = recent(2);
        assert_eq!(recent_two.len(), 2);
        // Newest first
        assert_eq!(recent_two[0].pca1, 4.0);
        assert_eq!(recent_two[1].pca1, 3.0);

        let stats = stats().unwrap();
        assert_eq!(stats.records, 5);
    }
}
