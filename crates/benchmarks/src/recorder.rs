//! Batch throughput recorder.
//!
//! The recorder counts completed messages in fixed-size windows. The first
//! observation of a window stamps the start instant; the observation that
//! fills the window computes throughput, reports it and resets the window.
//! Workers call [`BenchmarkRecorder::observe`] concurrently, so the whole
//! count/stamp/reset sequence runs under one lock.

use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::result::BenchmarkResult;

/// Number of finished batches kept for export.
pub const HISTORY_LIMIT: usize = 256;

/// Measurements of one completed window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    /// 1-based batch number since the recorder was created.
    pub sequence: u64,
    /// Messages in the batch.
    pub batch_size: usize,
    /// Wall-clock time of the first observation.
    pub started_at: DateTime<Utc>,
    /// Wall-clock time of the last observation.
    pub finished_at: DateTime<Utc>,
    /// Time between first and last observation, in milliseconds.
    pub elapsed_ms: f64,
    /// Messages per second.
    pub throughput: f64,
}

impl BatchReport {
    /// Convert into the canonical benchmark result format.
    pub fn to_result(&self) -> BenchmarkResult {
        BenchmarkResult {
            target_id: format!("listener/batch-{}", self.sequence),
            metrics: serde_json::json!({
                "batch_size": self.batch_size,
                "started_at": self.started_at.to_rfc3339(),
                "finished_at": self.finished_at.to_rfc3339(),
                "elapsed_ms": self.elapsed_ms,
                "throughput": self.throughput,
            }),
            timestamp: self.finished_at,
        }
    }
}

#[derive(Debug, Default)]
struct Window {
    start: Option<(Instant, DateTime<Utc>)>,
    collected: usize,
}

#[derive(Debug, Default)]
struct RecorderState {
    window: Window,
    sequence: u64,
    history: VecDeque<BatchReport>,
}

/// Shared throughput recorder.
#[derive(Debug)]
pub struct BenchmarkRecorder {
    batch_size: NonZeroUsize,
    state: Mutex<RecorderState>,
}

impl BenchmarkRecorder {
    /// Create a recorder reporting every `batch_size` observations.
    pub fn new(batch_size: NonZeroUsize) -> Self {
        Self {
            batch_size,
            state: Mutex::new(RecorderState::default()),
        }
    }

    /// Configured window size.
    pub fn batch_size(&self) -> usize {
        self.batch_size.get()
    }

    /// Observations collected in the current window.
    pub fn collected(&self) -> usize {
        self.lock().window.collected
    }

    /// Record one processed message.
    ///
    /// Returns the batch report when this observation completes a window.
    pub fn observe(&self) -> Option<BatchReport> {
        let report = {
            let mut state = self.lock();
            let now = Instant::now();
            let (start, started_at) = *state.window.start.get_or_insert_with(|| (now, Utc::now()));

            state.window.collected += 1;
            if state.window.collected < self.batch_size.get() {
                return None;
            }

            let elapsed = now.duration_since(start);
            state.window = Window::default();
            state.sequence += 1;

            let report = BatchReport {
                sequence: state.sequence,
                batch_size: self.batch_size.get(),
                started_at,
                finished_at: Utc::now(),
                elapsed_ms: elapsed.as_secs_f64() * 1000.0,
                throughput: throughput(self.batch_size.get(), elapsed),
            };

            if state.history.len() == HISTORY_LIMIT {
                state.history.pop_front();
            }
            state.history.push_back(report.clone());
            report
        };

        info!(
            batch = report.sequence,
            messages = report.batch_size,
            elapsed_ms = report.elapsed_ms,
            throughput = report.throughput,
            "Benchmark batch finished"
        );
        metrics::gauge!("listener_batch_throughput").set(report.throughput);
        metrics::counter!("listener_batches_total").increment(1);

        Some(report)
    }

    /// Finished batches, oldest first.
    pub fn reports(&self) -> Vec<BatchReport> {
        self.lock().history.iter().cloned().collect()
    }

    /// Finished batches in the canonical benchmark result format.
    pub fn results(&self) -> Vec<BenchmarkResult> {
        self.lock().history.iter().map(BatchReport::to_result).collect()
    }

    fn lock(&self) -> MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn throughput(messages: usize, elapsed: Duration) -> f64 {
    // A single-message window has no measurable duration.
    let secs = elapsed.as_secs_f64().max(1e-9);
    messages as f64 / secs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn recorder(batch_size: usize) -> BenchmarkRecorder {
        BenchmarkRecorder::new(NonZeroUsize::new(batch_size).unwrap())
    }

    #[test]
    fn test_reports_once_per_window() {
        let recorder = recorder(3);

        assert!(recorder.observe().is_none());
        assert_eq!(recorder.collected(), 1);
        assert!(recorder.observe().is_none());
        assert_eq!(recorder.collected(), 2);

        let report = recorder.observe().expect("third observation closes the window");
        assert_eq!(report.sequence, 1);
        assert_eq!(report.batch_size, 3);
        assert!(report.throughput > 0.0);
        assert!(report.started_at <= report.finished_at);
        assert_eq!(recorder.collected(), 0);

        assert!(recorder.observe().is_none());
        assert_eq!(recorder.collected(), 1);
        assert_eq!(recorder.reports().len(), 1);
    }

    #[test]
    fn test_window_restarts_clock() {
        let recorder = recorder(2);
        recorder.observe();
        thread::sleep(Duration::from_millis(20));
        let first = recorder.observe().unwrap();
        assert!(first.elapsed_ms >= 20.0);

        recorder.observe();
        let second = recorder.observe().unwrap();
        assert_eq!(second.sequence, 2);
        assert!(second.elapsed_ms < first.elapsed_ms);
        assert!(second.started_at >= first.finished_at);
    }

    #[test]
    fn test_single_message_window() {
        let recorder = recorder(1);
        let report = recorder.observe().unwrap();
        assert!(report.throughput.is_finite());
        assert_eq!(recorder.collected(), 0);
    }

    #[test]
    fn test_concurrent_observers() {
        let recorder = Arc::new(recorder(30));
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let recorder = Arc::clone(&recorder);
                thread::spawn(move || (0..30).filter(|_| recorder.observe().is_some()).count())
            })
            .collect();

        let reported: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(reported, 10);
        assert_eq!(recorder.collected(), 0);

        let sequences: Vec<u64> = recorder.reports().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, (1..=10).collect::<Vec<_>>());
    }

    #[test]
    fn test_history_is_bounded() {
        let recorder = recorder(1);
        for _ in 0..HISTORY_LIMIT + 5 {
            recorder.observe();
        }
        let reports = recorder.reports();
        assert_eq!(reports.len(), HISTORY_LIMIT);
        assert_eq!(reports[0].sequence, 6);
    }

    #[test]
    fn test_results_use_batch_target_ids() {
        let recorder = recorder(2);
        recorder.observe();
        recorder.observe();

        let results = recorder.results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].target_id, "listener/batch-1");
        assert_eq!(results[0].metrics["batch_size"], 2);
        assert!(results[0].metrics["throughput"].as_f64().unwrap() > 0.0);
    }
}
