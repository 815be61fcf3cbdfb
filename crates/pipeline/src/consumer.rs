// Copyright 2025 Inventory Listener Contributors
// SPDX-License-Identifier: Apache-2.0

//! Consumer loop.
//!
//! Pulls messages one at a time from a [`MessageSource`], decodes each one
//! into a [`RawReport`] and hands a processing task to the
//! [`BoundedExecutor`]. Nothing is processed inline: when the executor queue
//! is full the loop waits in `submit`, which in turn slows how fast the
//! source is read.

use std::sync::Arc;
use std::time::Duration;

use inventory_listener_adapters::{Message, MessageSource};
use inventory_listener_core::RawReport;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::executor::{BoundedExecutor, ExecutorError};
use crate::processor::ReportProcessor;

/// Pause before pulling again after a source error.
pub const RECEIVE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Counters for one consumer run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerStats {
    /// Messages pulled from the source.
    pub received: u64,
    /// Messages handed to the executor.
    pub submitted: u64,
    /// Messages skipped because they did not decode.
    pub malformed: u64,
}

/// Pull loop feeding the bounded executor.
pub struct Consumer<S> {
    source: S,
    executor: Arc<BoundedExecutor>,
    processor: Arc<ReportProcessor>,
}

impl<S: MessageSource> Consumer<S> {
    /// Create a consumer; call [`run`](Self::run) to start pulling.
    pub fn new(source: S, executor: Arc<BoundedExecutor>, processor: Arc<ReportProcessor>) -> Self {
        Self {
            source,
            executor,
            processor,
        }
    }

    /// Consume until `shutdown` fires or the source is exhausted, then
    /// drain the executor.
    ///
    /// Fails only when the executor was closed by someone else while the
    /// loop was still running.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<ConsumerStats, ExecutorError> {
        info!(topic = %self.source.topic(), "Consumer started");
        let mut stats = ConsumerStats::default();

        let outcome = loop {
            let next = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Stop requested");
                    break Ok(());
                }
                next = self.source.recv() => next,
            };

            match next {
                Ok(Some(message)) => {
                    stats.received += 1;
                    metrics::counter!("listener_messages_received_total").increment(1);
                    if let Err(e) =
                        dispatch(&self.executor, &self.processor, message, &mut stats).await
                    {
                        break Err(e);
                    }
                }
                Ok(None) => {
                    info!("Message source exhausted");
                    break Ok(());
                }
                Err(e) => {
                    warn!(topic = %self.source.topic(), error = %e, "Failed to receive message");
                    tokio::select! {
                        _ = shutdown.cancelled() => {}
                        _ = tokio::time::sleep(RECEIVE_RETRY_DELAY) => {}
                    }
                }
            }
        };

        self.executor.drain().await;
        info!(
            received = stats.received,
            submitted = stats.submitted,
            malformed = stats.malformed,
            "Consumer stopped"
        );

        outcome.map(|()| stats)
    }
}

async fn dispatch(
    executor: &BoundedExecutor,
    processor: &Arc<ReportProcessor>,
    message: Message,
    stats: &mut ConsumerStats,
) -> Result<(), ExecutorError> {
    let report = match RawReport::decode(&message.payload) {
        Ok(report) => report,
        Err(e) => {
            stats.malformed += 1;
            metrics::counter!("listener_messages_malformed_total").increment(1);
            warn!(message = %message.reference, error = %e, "Skipping malformed message");
            return Ok(());
        }
    };

    let processor = Arc::clone(processor);
    executor
        .submit(message.reference, async move { processor.process(report).await })
        .await?;
    stats.submitted += 1;
    Ok(())
}
