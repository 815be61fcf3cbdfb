// Copyright 2025 Inventory Listener Contributors
// SPDX-License-Identifier: Apache-2.0

//! Per-message processing unit run on executor workers.

use std::sync::Arc;

use anyhow::Context;
use inventory_listener_adapters::HostSink;
use inventory_listener_benchmarks::BenchmarkRecorder;
use inventory_listener_core::{request, RawReport, StoredHost};
use tracing::debug;

/// Builds, stores and records one report.
pub struct ReportProcessor {
    sink: Arc<dyn HostSink>,
    recorder: Arc<BenchmarkRecorder>,
}

impl ReportProcessor {
    /// Create a processor writing to `sink` and reporting to `recorder`.
    pub fn new(sink: Arc<dyn HostSink>, recorder: Arc<BenchmarkRecorder>) -> Self {
        Self { sink, recorder }
    }

    /// Canonicalize `report`, store it, then count it towards the current
    /// benchmark window.
    ///
    /// Only successfully stored reports are observed by the recorder.
    pub async fn process(&self, report: RawReport) -> anyhow::Result<()> {
        let built = request::build(&report)
            .with_context(|| format!("failed to build request for host {}", report.id))?;
        let host = StoredHost::from_built(built);
        let id = host.id;

        self.sink
            .insert(host)
            .await
            .with_context(|| format!("failed to store host {id}"))?;

        debug!(host_id = id, "Host stored");
        self.recorder.observe();
        Ok(())
    }
}
