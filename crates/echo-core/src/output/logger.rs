//! Message Logger
//!
//! Append-only JSONL log of every message posted during a run.

use echo_events::Message;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Writes each message as one JSON line
pub struct MessageLogger {
    sink: Option<BufWriter<File>>,
    message_count: u64,
}

impl MessageLogger {
    /// Truncate (or create) the log at `path`
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let sink = BufWriter::new(File::create(path)?);
        Ok(Self {
            sink: Some(sink),
            message_count: 0,
        })
    }

    /// Count messages without writing them anywhere
    pub fn discard() -> Self {
        Self {
            sink: None,
            message_count: 0,
        }
    }

    pub fn message_count(&self) -> u64 {
        self.message_count
    }

    pub fn log(&mut self, msg: &Message) -> io::Result<()> {
        self.message_count += 1;
        match self.sink.as_mut() {
            Some(sink) => {
                serde_json::to_writer(&mut *sink, msg)?;
                sink.write_all(b"\n")
            }
            None => Ok(()),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.sink.as_mut().map_or(Ok(()), |sink| sink.flush())
    }
}

impl Drop for MessageLogger {
    fn drop(&mut self) {
        if let Err(err) = self.flush() {
            tracing::warn!("Message log not fully written: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discarding_logger_counts() {
        let mut logger = MessageLogger::discard();
        logger.log(&Message::original(0, 1, 0.5)).unwrap();
        logger.log(&Message::original(1, 2, -0.5)).unwrap();
        assert_eq!(logger.message_count(), 2);
    }

    #[test]
    fn test_logger_writes_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("messages.jsonl");

        {
            let mut logger = MessageLogger::new(&path).unwrap();
            let msg = Message::original(0, 1, 0.5);
            logger.log(&msg).unwrap();
            logger.log(&msg.repost(1, 2)).unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let messages: Vec<Message> = content
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].who_posted, 2);
        assert_eq!(messages[1].orig_msg_id, 0);
    }
}
