// Copyright 2025 Inventory Listener Contributors
// SPDX-License-Identifier: Apache-2.0

//! External collaborators of the inventory listener.
//!
//! This crate provides the two seams of the ingestion pipeline:
//!
//! - **Sources** ([`source`]): where raw report payloads come from
//! - **Sinks** ([`sink`]): where stored host records go
//!
//! # Architecture
//!
//! Each adapter is a thin wrapper around its backing technology, exposing
//! only what the pipeline needs through the [`MessageSource`] and
//! [`HostSink`] traits.
//!
//! # Example
//!
//! ```
//! use inventory_listener_adapters::prelude::*;
//!
//! let (_sender, source) = ChannelSource::channel("host.packages", 16);
//! let sink = MemorySink::new();
//! assert_eq!(source.topic(), "host.packages");
//! assert!(sink.is_empty());
//! ```

#![warn(missing_docs, rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod sink;
pub mod source;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use super::sink::{HostSink, MemorySink, PostgresSink, SinkError};
    pub use super::source::{
        ChannelSource, LineSource, Message, MessageSource, RedisListSource, SourceError,
    };
}

pub use sink::{HostSink, SinkError};
pub use source::{Message, MessageSource, SourceError};
