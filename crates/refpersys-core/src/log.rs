//! Structured JSONL logging, in the manner of
//! `frankenlibc-harness::structured_log`: one self-describing JSON object
//! per line, easy to `grep`/`jq` and to replay in tests.

use serde::Serialize;
use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Severity level for a [`LogEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// One structured log record.
#[derive(Debug, Clone, Serialize)]
pub struct LogEvent {
    pub seq: u64,
    pub level: LogLevel,
    pub component: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

/// A JSONL sink guarded by a mutex so multiple threads can log without
/// interleaving partial lines.
pub struct Logger {
    sink: Mutex<Box<dyn Write + Send>>,
    seq: AtomicU64,
    min_level: LogLevel,
}

impl LogLevel {
    fn rank(self) -> u8 {
        match self {
            LogLevel::Trace => 0,
            LogLevel::Debug => 1,
            LogLevel::Info => 2,
            LogLevel::Warn => 3,
            LogLevel::Error => 4,
        }
    }
}

impl Logger {
    pub fn new(sink: Box<dyn Write + Send>, min_level: LogLevel) -> Logger {
        Logger {
            sink: Mutex::new(sink),
            seq: AtomicU64::new(0),
            min_level,
        }
    }

    /// Builds a logger writing to stderr at [`LogLevel::Info`].
    pub fn stderr() -> Logger {
        Logger::new(Box::new(std::io::stderr()), LogLevel::Info)
    }

    pub fn log(&self, level: LogLevel, component: &'static str, message: impl Into<String>) {
        self.log_detail(level, component, message, None)
    }

    pub fn log_detail(
        &self,
        level: LogLevel,
        component: &'static str,
        message: impl Into<String>,
        detail: Option<serde_json::Value>,
    ) {
        if level.rank() < self.min_level.rank() {
            return;
        }
        let event = LogEvent {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            level,
            component,
            message: message.into(),
            detail,
        };
        let line = serde_json::to_string(&event).expect("LogEvent is always serializable");
        let mut sink = self.sink.lock().expect("log sink mutex poisoned");
        let _ = writeln!(sink, "{line}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn below_threshold_events_are_dropped() {
        let buf: Vec<u8> = Vec::new();
        let shared = std::sync::Arc::new(Mutex::new(buf));
        struct SharedWriter(std::sync::Arc<Mutex<Vec<u8>>>);
        impl Write for SharedWriter {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().write(buf)
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let logger = Logger::new(Box::new(SharedWriter(shared.clone())), LogLevel::Warn);
        logger.log(LogLevel::Debug, "oid", "ignored");
        logger.log(LogLevel::Error, "oid", "kept");
        let out = String::from_utf8(shared.lock().unwrap().clone()).unwrap();
        assert_eq!(out.lines().count(), 1);
        assert!(out.contains("kept"));
    }
}
