//! Redis list source.
//!
//! Producers `RPUSH` JSON payloads onto a list named after the topic; this
//! source pops them with `BLPOP`, which gives FIFO delivery across any
//! number of producers.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tracing::{debug, info};

use super::{Message, MessageSource, Result};

/// How long a single `BLPOP` waits before polling again.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Source popping payloads from a Redis list.
pub struct RedisListSource {
    topic: String,
    conn: ConnectionManager,
    offset: u64,
}

impl RedisListSource {
    /// Connect to `url` and subscribe to the list named `topic`.
    pub async fn connect(url: &str, topic: impl Into<String>) -> Result<Self> {
        let topic = topic.into();
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        info!(topic = %topic, "Connected to Redis message source");

        Ok(Self {
            topic,
            conn,
            offset: 0,
        })
    }
}

#[async_trait]
impl MessageSource for RedisListSource {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn recv(&mut self) -> Result<Option<Message>> {
        let timeout = POLL_TIMEOUT.as_secs();
        loop {
            let reply: Option<(String, Vec<u8>)> = redis::cmd("BLPOP")
                .arg(&self.topic)
                .arg(timeout)
                .query_async(&mut self.conn)
                .await?;

            if let Some((_, payload)) = reply {
                let message = Message::new(&self.topic, self.offset, payload);
                self.offset += 1;
                return Ok(Some(message));
            }
            debug!(topic = %self.topic, "Waiting for messages");
        }
    }
}
