//! Message sinks.

use crate::error::SyncResult;
use slacktap_protocol::Message;
use std::io::{BufWriter, Write};

/// Destination of output messages.
pub trait MessageSink {
    /// Queues one message.
    fn emit(&mut self, message: Message) -> SyncResult<()>;

    /// Makes every queued message durable at the destination.
    fn flush(&mut self) -> SyncResult<()>;
}

/// Writes one JSON line per message.
pub struct JsonLinesSink<W: Write> {
    writer: BufWriter<W>,
    written: u64,
}

impl<W: Write> JsonLinesSink<W> {
    /// Wraps `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
            written: 0,
        }
    }

    /// Number of messages written.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flushes and returns the inner writer.
    pub fn into_inner(self) -> SyncResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| crate::error::SyncError::Io(e.into_error()))
    }
}

impl<W: Write> MessageSink for JsonLinesSink<W> {
    fn emit(&mut self, message: Message) -> SyncResult<()> {
        let line = message.to_line()?;
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    fn flush(&mut self) -> SyncResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Collects messages in memory.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    messages: Vec<Message>,
    flushes: usize,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// All messages in emission order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of flushes.
    pub fn flushes(&self) -> usize {
        self.flushes
    }

    /// RECORD payloads of `stream`.
    pub fn records(&self, stream: &str) -> Vec<&slacktap_protocol::Record> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::Record {
                    stream: s, record, ..
                } if s == stream => Some(record),
                _ => None,
            })
            .collect()
    }

    /// STATE payloads in emission order.
    pub fn states(&self) -> Vec<&slacktap_protocol::StateDocument> {
        self.messages
            .iter()
            .filter_map(|m| match m {
                Message::State { value } => Some(value),
                _ => None,
            })
            .collect()
    }
}

impl MessageSink for MemorySink {
    fn emit(&mut self, message: Message) -> SyncResult<()> {
        self.messages.push(message);
        Ok(())
    }

    fn flush(&mut self) -> SyncResult<()> {
        self.flushes += 1;
        Ok(())
    }
}

impl<S: MessageSink + ?Sized> MessageSink for Box<S> {
    fn emit(&mut self, message: Message) -> SyncResult<()> {
        (**self).emit(message)
    }

    fn flush(&mut self) -> SyncResult<()> {
        (**self).flush()
    }
}
