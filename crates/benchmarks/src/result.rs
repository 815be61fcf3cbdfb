//! Benchmark result types.
//!
//! [`BenchmarkResult`] is the export format for finished benchmark batches,
//! one entry per batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical benchmark result structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkResult {
    /// Identifier of the measured batch, e.g. `listener/batch-3`.
    pub target_id: String,
    /// Metrics data in JSON format.
    pub metrics: serde_json::Value,
    /// Timestamp when the batch finished.
    pub timestamp: DateTime<Utc>,
}

impl BenchmarkResult {
    /// Create a new BenchmarkResult stamped with the current time.
    pub fn new(target_id: impl Into<String>, metrics: serde_json::Value) -> Self {
        Self {
            target_id: target_id.into(),
            metrics,
            timestamp: Utc::now(),
        }
    }
}
