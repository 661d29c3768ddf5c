// src/loggers/mod.rs

pub mod builder;
pub mod core;
pub mod worker;
pub mod transports;

pub use builder::{Logger, LoggerBuilder};
pub use core::{LogEntry, LogLevel};
pub use transports::{ChannelTransport, FileTransport, LogTransport, StdoutTransport};

/// Context value for a log entry; anything that fails to serialize is logged as null.
pub fn context_value<T: serde::Serialize + ?Sized>(value: &T) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

#[macro_export]
macro_rules! log_base {
    ($logger:expr, $level:expr, $msg:expr $(, $k:expr => $v:expr )* $(,)? ) => {
        {
            let __logger = &$logger;
            // context is only built for entries that pass the level filter
            if __logger.enabled($level) {
                #[allow(unused_mut)]
                let mut ctx = std::collections::HashMap::new();
                $(
                    ctx.insert($k.to_string(), $crate::loggers::context_value(&$v));
                )*
                __logger.emit($level, $msg.to_string(), ctx);
            }
        }
    };
}

#[macro_export]
macro_rules! trace {
    ($logger:expr, $msg:expr $(, $k:expr => $v:expr )* $(,)? ) => {
        $crate::log_base!($logger, $crate::loggers::core::LogLevel::Trace, $msg $(, $k => $v )* )
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $msg:expr $(, $k:expr => $v:expr )* $(,)? ) => {
        $crate::log_base!($logger, $crate::loggers::core::LogLevel::Debug, $msg $(, $k => $v )* )
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $msg:expr $(, $k:expr => $v:expr )* $(,)? ) => {
        $crate::log_base!($logger, $crate::loggers::core::LogLevel::Info, $msg $(, $k => $v )* )
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $msg:expr $(, $k:expr => $v:expr )* $(,)? ) => {
        $crate::log_base!($logger, $crate::loggers::core::LogLevel::Warn, $msg $(, $k => $v )* )
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $msg:expr $(, $k:expr => $v:expr )* $(,)? ) => {
        $crate::log_base!($logger, $crate::loggers::core::LogLevel::Error, $msg $(, $k => $v )* )
    };
}

#[macro_export]
macro_rules! fatal {
    ($logger:expr, $msg:expr $(, $k:expr => $v:expr )* $(,)? ) => {
        $crate::log_base!($logger, $crate::loggers::core::LogLevel::Fatal, $msg $(, $k => $v )* )
    };
}
