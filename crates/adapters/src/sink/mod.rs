// Copyright 2025 Inventory Listener Contributors
// SPDX-License-Identifier: Apache-2.0

//! Persistence sinks for stored host records.
//!
//! A [`HostSink`] is keyed by host id and has upsert semantics: inserting a
//! record for an id that already exists replaces it. Sinks must accept
//! concurrent writes for distinct ids; the pipeline does not serialize them.

use async_trait::async_trait;
use inventory_listener_core::{HostId, StoredHost};
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::MemorySink;
pub use postgres::PostgresSink;

/// Errors that can occur while talking to a sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink cannot accept requests right now.
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Result type for sink operations.
pub type Result<T> = std::result::Result<T, SinkError>;

/// Durable store of host records.
#[async_trait]
pub trait HostSink: Send + Sync {
    /// Insert or replace the record for `host.id`.
    async fn insert(&self, host: StoredHost) -> Result<()>;

    /// Fetch the record for `id`, if any.
    async fn get(&self, id: HostId) -> Result<Option<StoredHost>>;

    /// Remove every record, returning how many were removed.
    async fn delete_all(&self) -> Result<u64>;
}
