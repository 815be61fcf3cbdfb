//! In-process channel source.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{Message, MessageSource, Result};

/// Source backed by a bounded tokio channel.
///
/// The source is exhausted once every sender has been dropped and the
/// buffered payloads are consumed.
#[derive(Debug)]
pub struct ChannelSource {
    topic: String,
    receiver: mpsc::Receiver<Vec<u8>>,
    offset: u64,
}

impl ChannelSource {
    /// Create a source and the sender used to publish payloads to it.
    pub fn channel(topic: impl Into<String>, capacity: usize) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (sender, receiver) = mpsc::channel(capacity);
        let source = Self {
            topic: topic.into(),
            receiver,
            offset: 0,
        };
        (sender, source)
    }
}

#[async_trait]
impl MessageSource for ChannelSource {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn recv(&mut self) -> Result<Option<Message>> {
        let Some(payload) = self.receiver.recv().await else {
            return Ok(None);
        };
        let message = Message::new(&self.topic, self.offset, payload);
        self.offset += 1;
        Ok(Some(message))
    }
}
