// Copyright 2025 Inventory Listener Contributors
// SPDX-License-Identifier: Apache-2.0

//! Message sources.
//!
//! A [`MessageSource`] delivers raw payloads from one topic, one message at
//! a time and in delivery order. The consumer loop pulls from it; sources
//! never push.
//!
//! - [`ChannelSource`] - in-process tokio channel
//! - [`LineSource`] - newline-delimited payloads from any async reader
//! - [`RedisListSource`] - blocking pops from a Redis list named after the topic

use async_trait::async_trait;
use thiserror::Error;

pub mod channel;
pub mod lines;
pub mod redis_list;

pub use self::channel::ChannelSource;
pub use self::lines::LineSource;
pub use self::redis_list::RedisListSource;

/// Errors that can occur while receiving messages.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Reading from the underlying stream failed.
    #[error("I/O error while reading messages: {0}")]
    Io(#[from] std::io::Error),

    /// The Redis connection or command failed.
    #[error("Redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

/// Result type for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// A single message pulled from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Human-readable position of the message, used in logs.
    pub reference: String,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
}

impl Message {
    /// Create a message for `topic` at position `offset`.
    pub fn new(topic: &str, offset: u64, payload: Vec<u8>) -> Self {
        Self {
            reference: format!("{topic}/{offset}"),
            payload,
        }
    }
}

/// Pull-based source of raw messages.
#[async_trait]
pub trait MessageSource: Send {
    /// Topic this source is subscribed to.
    fn topic(&self) -> &str;

    /// Wait for the next message.
    ///
    /// Returns `Ok(None)` once the source is exhausted and will never
    /// produce another message.
    async fn recv(&mut self) -> Result<Option<Message>>;
}
