// Copyright 2025 Inventory Listener Contributors
// SPDX-License-Identifier: Apache-2.0

//! Ingestion pipeline for package inventory reports.
//!
//! ```text
//! MessageSource ─> Consumer ─> BoundedExecutor ─> worker: ReportProcessor
//!                                (backpressure)        ├─ canonicalize + checksum
//!                                                      ├─ HostSink::insert
//!                                                      └─ BenchmarkRecorder::observe
//! ```
//!
//! # Modules
//!
//! - [`executor`] - bounded work queue and worker pool
//! - [`consumer`] - pull loop feeding the executor
//! - [`processor`] - per-message unit of work
//! - [`config`] - layered listener configuration

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod config;
pub mod consumer;
pub mod executor;
pub mod processor;

use std::sync::Arc;

use inventory_listener_adapters::{HostSink, MessageSource};
use inventory_listener_benchmarks::BenchmarkRecorder;
use tokio_util::sync::CancellationToken;

pub use self::config::{ConfigError, ListenerConfig, SinkKind, SourceKind};
pub use self::consumer::{Consumer, ConsumerStats};
pub use self::executor::{BoundedExecutor, ExecutorConfig, ExecutorError, ExecutorState, ExecutorStats};
pub use self::processor::ReportProcessor;

/// Start an executor, consume `source` until it is exhausted or `shutdown`
/// fires, and drain.
pub async fn run_pipeline<S: MessageSource>(
    source: S,
    executor_config: ExecutorConfig,
    sink: Arc<dyn HostSink>,
    recorder: Arc<BenchmarkRecorder>,
    shutdown: CancellationToken,
) -> Result<ConsumerStats, ExecutorError> {
    let executor = Arc::new(BoundedExecutor::start(executor_config)?);
    let processor = Arc::new(ReportProcessor::new(sink, recorder));
    Consumer::new(source, executor, processor).run(shutdown).await
}
