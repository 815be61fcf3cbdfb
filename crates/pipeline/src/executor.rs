// Copyright 2025 Inventory Listener Contributors
// SPDX-License-Identifier: Apache-2.0

//! Bounded work queue with a fixed worker pool.
//!
//! Submitted tasks go into a bounded channel of `queue_capacity` slots that
//! `worker_count` long-lived workers pull from. When every slot is taken,
//! [`BoundedExecutor::submit`] waits until a worker dequeues a task; this
//! wait is the only backpressure in the pipeline and it throttles whoever
//! submits.
//!
//! # State machine
//!
//! ```text
//! Running ──drain()──> Draining ──(queue empty, workers joined)──> Stopped
//! ```
//!
//! A task that returns an error or panics is logged and counted. The worker
//! that ran it moves on to the next task.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Errors that can occur when configuring or submitting to the executor.
#[derive(Debug, Error)]
pub enum ExecutorError {
    /// Capacity or worker count is zero.
    #[error("Invalid executor configuration: {0}")]
    InvalidConfig(String),

    /// The executor no longer accepts tasks.
    #[error("Executor is not accepting tasks (state: {0:?})")]
    Closed(ExecutorState),
}

/// Result type for executor operations.
pub type Result<T> = std::result::Result<T, ExecutorError>;

/// Unit of work run by a worker.
pub type TaskFuture = BoxFuture<'static, anyhow::Result<()>>;

/// Lifecycle of a [`BoundedExecutor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutorState {
    /// Accepting and running tasks.
    Running,
    /// No longer accepting tasks; finishing queued and in-flight ones.
    Draining,
    /// Every accepted task has finished and all workers have exited.
    Stopped,
}

impl ExecutorState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Running,
            1 => Self::Draining,
            _ => Self::Stopped,
        }
    }
}

/// Sizing of the queue and worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Maximum number of tasks waiting for a worker.
    pub queue_capacity: usize,
    /// Number of workers.
    pub worker_count: usize,
}

impl ExecutorConfig {
    /// Create a config; see [`ExecutorConfig::validate`].
    pub fn new(queue_capacity: usize, worker_count: usize) -> Self {
        Self {
            queue_capacity,
            worker_count,
        }
    }

    /// Reject zero-sized queues and pools.
    pub fn validate(&self) -> Result<()> {
        if self.queue_capacity == 0 {
            return Err(ExecutorError::InvalidConfig(
                "queue_capacity must be greater than 0".to_string(),
            ));
        }
        if self.worker_count == 0 {
            return Err(ExecutorError::InvalidConfig(
                "worker_count must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Counters describing executor activity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorStats {
    /// Tasks accepted into the queue.
    pub submitted: u64,
    /// Tasks that finished successfully.
    pub completed: u64,
    /// Tasks that returned an error or panicked.
    pub failed: u64,
    /// Tasks waiting in the queue.
    pub pending: usize,
}

struct Job {
    label: String,
    task: TaskFuture,
}

#[derive(Debug, Default)]
struct Counters {
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    pending: AtomicUsize,
}

/// Fixed-capacity task queue served by a fixed-size worker pool.
///
/// Must be started from within a tokio runtime.
pub struct BoundedExecutor {
    sender: Mutex<Option<mpsc::Sender<Job>>>,
    workers: tokio::sync::Mutex<Vec<JoinHandle<()>>>,
    state: AtomicU8,
    counters: Arc<Counters>,
}

impl BoundedExecutor {
    /// Validate `config` and spawn the worker pool.
    pub fn start(config: ExecutorConfig) -> Result<Self> {
        config.validate()?;

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        let counters = Arc::new(Counters::default());

        let workers = (0..config.worker_count)
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    Arc::clone(&receiver),
                    Arc::clone(&counters),
                ))
            })
            .collect();

        info!(
            queue_capacity = config.queue_capacity,
            worker_count = config.worker_count,
            "Bounded executor started"
        );

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            workers: tokio::sync::Mutex::new(workers),
            state: AtomicU8::new(ExecutorState::Running as u8),
            counters,
        })
    }

    /// Queue a task, waiting while the queue is full.
    ///
    /// `label` identifies the task in logs. Fails with
    /// [`ExecutorError::Closed`] once [`drain`](Self::drain) has been called;
    /// a task accepted before that point always runs.
    pub async fn submit<F>(&self, label: impl Into<String>, task: F) -> Result<()>
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let label = label.into();
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| ExecutorError::Closed(self.state()))?;

        let permit = sender
            .reserve()
            .await
            .map_err(|_| ExecutorError::Closed(self.state()))?;

        self.counters.pending.fetch_add(1, Ordering::SeqCst);
        self.counters.submitted.fetch_add(1, Ordering::Relaxed);
        permit.send(Job {
            label,
            task: task.boxed(),
        });
        record_queue_depth(self.pending());

        Ok(())
    }

    /// Stop accepting tasks and wait for every accepted task to finish.
    ///
    /// Idempotent; concurrent callers all return once the executor is
    /// stopped.
    pub async fn drain(&self) {
        let _ = self.state.compare_exchange(
            ExecutorState::Running as u8,
            ExecutorState::Draining as u8,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );

        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_some() {
            info!(pending = self.pending(), "Draining executor");
        }
        drop(sender);

        let mut workers = self.workers.lock().await;
        for handle in workers.drain(..) {
            if let Err(e) = handle.await {
                error!(error = %e, "Worker terminated abnormally");
            }
        }

        if self.state.swap(ExecutorState::Stopped as u8, Ordering::SeqCst)
            != ExecutorState::Stopped as u8
        {
            info!(stats = ?self.stats(), "Executor stopped");
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ExecutorState {
        ExecutorState::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Tasks waiting for a worker.
    pub fn pending(&self) -> usize {
        self.counters.pending.load(Ordering::SeqCst)
    }

    /// Snapshot of the activity counters.
    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            submitted: self.counters.submitted.load(Ordering::Relaxed),
            completed: self.counters.completed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            pending: self.pending(),
        }
    }
}

async fn worker_loop(
    worker: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<Job>>>,
    counters: Arc<Counters>,
) {
    debug!(worker, "Worker started");

    loop {
        let job = receiver.lock().await.recv().await;
        let Some(job) = job else { break };
        let depth = counters.pending.fetch_sub(1, Ordering::SeqCst) - 1;
        record_queue_depth(depth);
        run_job(worker, job, &counters).await;
    }

    debug!(worker, "Worker stopped");
}

fn record_queue_depth(depth: usize) {
    metrics::gauge!("listener_queue_depth").set(depth as f64);
}

async fn run_job(worker: usize, job: Job, counters: &Counters) {
    let Job { label, task } = job;

    match AssertUnwindSafe(task).catch_unwind().await {
        Ok(Ok(())) => {
            counters.completed.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("listener_tasks_completed_total").increment(1);
        }
        Ok(Err(e)) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("listener_tasks_failed_total").increment(1);
            error!(worker, task = %label, error = %format!("{e:#}"), "Task failed");
        }
        Err(panic) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            metrics::counter!("listener_tasks_failed_total").increment(1);
            error!(worker, task = %label, panic = panic_message(&*panic), "Task panicked");
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
