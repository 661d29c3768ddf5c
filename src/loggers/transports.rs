//! Destinations for log entries. Each transport is owned by the worker task,
//! so implementations need `Send` but no internal locking.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use tokio::sync::mpsc;

use crate::core::error::AgentError;
use crate::loggers::core::LogEntry;

pub trait LogTransport: Send {
    fn write(&mut self, entry: &LogEntry);

    fn flush(&mut self) {}
}

/// One JSON document per line on stdout.
pub struct StdoutTransport;

impl LogTransport for StdoutTransport {
    fn write(&mut self, entry: &LogEntry) {
        if let Ok(json) = serde_json::to_string(entry) {
            println!("{}", json);
        }
    }
}

/// Appends JSON lines to a file.
pub struct FileTransport {
    out: BufWriter<File>,
}

impl FileTransport {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AgentError> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| AgentError::io(path, e))?;
        Ok(Self { out: BufWriter::new(file) })
    }
}

impl LogTransport for FileTransport {
    fn write(&mut self, entry: &LogEntry) {
        if let Ok(json) = serde_json::to_string(entry) {
            let _ = writeln!(self.out, "{}", json);
            let _ = self.out.flush();
        }
    }

    fn flush(&mut self) {
        let _ = self.out.flush();
    }
}

/// Forwards entries to a consumer living on another thread (a UI, the CLI printer, a test).
pub struct ChannelTransport {
    tx: mpsc::UnboundedSender<LogEntry>,
}

impl ChannelTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<LogEntry>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl LogTransport for ChannelTransport {
    fn write(&mut self, entry: &LogEntry) {
        // receiver gone: nobody is listening any more
        let _ = self.tx.send(entry.clone());
    }
}
