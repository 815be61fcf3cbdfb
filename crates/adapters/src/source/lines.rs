//! Newline-delimited payload source.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};

use super::{Message, MessageSource, Result};

/// Source reading one payload per line, e.g. JSON reports piped on stdin.
///
/// Blank lines are skipped. The source is exhausted at end of input.
pub struct LineSource<R> {
    topic: String,
    lines: Lines<R>,
    line_no: u64,
}

impl<R: AsyncBufRead + Unpin> LineSource<R> {
    /// Wrap `reader` as a source for `topic`.
    pub fn new(topic: impl Into<String>, reader: R) -> Self {
        Self {
            topic: topic.into(),
            lines: reader.lines(),
            line_no: 0,
        }
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> MessageSource for LineSource<R> {
    fn topic(&self) -> &str {
        &self.topic
    }

    async fn recv(&mut self) -> Result<Option<Message>> {
        while let Some(line) = self.lines.next_line().await? {
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Ok(Some(Message {
                reference: format!("{}/line-{}", self.topic, self.line_no),
                payload: line.into_bytes(),
            }));
        }
        Ok(None)
    }
}
