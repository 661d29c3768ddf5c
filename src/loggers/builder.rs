use tokio::sync::mpsc;
use crate::loggers::worker::LogWorker;
use crate::loggers::core::{LogLevel, LogEntry};
use crate::loggers::transports::{LogTransport, StdoutTransport};
use std::sync::Arc;
use arc_swap::ArcSwap;
use chrono::Utc;
use serde_json::Value;
use std::collections::HashMap;

pub struct LoggerConfig {
    pub level: LogLevel,
    pub component: String,
}

/// Cheap, cloneable handle. Sending never blocks, so it is safe from any thread.
#[derive(Clone)]
pub struct Logger {
    pub sender: mpsc::Sender<LogEntry>,
    pub config: Arc<ArcSwap<LoggerConfig>>,
}

impl Logger {
    pub fn enabled(&self, level: LogLevel) -> bool {
        level >= self.config.load().level
    }

    /// Queues one entry for the worker. A full or closed channel drops it.
    pub fn emit(&self, level: LogLevel, msg: String, ctx: HashMap<String, Value>) {
        let entry = LogEntry {
            ts: Utc::now(),
            level,
            msg,
            component: self.config.load().component.clone(),
            ctx,
            sys: None,
        };
        let _ = self.sender.try_send(entry);
    }

    /// Changes the minimum level at runtime for every clone of this handle.
    pub fn set_level(&self, level: LogLevel) {
        let component = self.config.load().component.clone();
        self.config.store(Arc::new(LoggerConfig { level, component }));
    }

    /// A handle sharing the same worker but tagging entries with another component name.
    pub fn for_component(&self, component: &str) -> Logger {
        let level = self.config.load().level;
        Logger {
            sender: self.sender.clone(),
            config: Arc::new(ArcSwap::from_pointee(LoggerConfig {
                level,
                component: component.to_string(),
            })),
        }
    }
}

pub struct LoggerBuilder {
    component: String,
    level: LogLevel,
    buffer_size: usize,
    transports: Vec<Box<dyn LogTransport>>,
    sys_info: bool,
}

impl LoggerBuilder {
    pub fn new(component: &str) -> Self {
        Self {
            component: component.to_string(),
            level: LogLevel::Info,
            buffer_size: 1024,
            transports: Vec::new(),
            sys_info: true,
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn with_buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    /// Adds a transport. Without any, entries go to stdout.
    pub fn with_transport(mut self, transport: Box<dyn LogTransport>) -> Self {
        self.transports.push(transport);
        self
    }

    /// Disables the per-entry resource snapshot.
    pub fn without_sys_info(mut self) -> Self {
        self.sys_info = false;
        self
    }

    /// Spawns the worker on the current tokio runtime.
    pub fn build(mut self) -> Result<Logger, crate::core::error::AgentError> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(crate::core::error::AgentError::InternalError(
                "Logger requires a running tokio runtime".into(),
            ));
        }

        let (tx, rx) = mpsc::channel(self.buffer_size);
        let config = Arc::new(ArcSwap::from_pointee(LoggerConfig {
            level: self.level,
            component: self.component,
        }));

        if self.transports.is_empty() {
            self.transports.push(Box::new(StdoutTransport));
        }

        let worker = LogWorker::new(rx, self.transports, self.sys_info);
        tokio::spawn(async move {
            worker.run().await;
        });

        Ok(Logger { sender: tx, config })
    }
}
