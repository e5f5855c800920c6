//! Injectable log sink for the replay engine.
//!
//! The server and request handler never call `tracing` directly for the
//! user-facing request lines; they go through a [`ReplayLog`] so tests can
//! observe exactly what was reported.

use parking_lot::Mutex;
use tracing::{error, info};

/// Destination for request and lifecycle log lines.
pub trait ReplayLog: Send + Sync {
    fn info(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to the `tracing` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLog;

impl ReplayLog for TracingLog {
    fn info(&self, message: &str) {
        info!(target: "har_replay", "{message}");
    }

    fn error(&self, message: &str) {
        error!(target: "har_replay", "{message}");
    }
}

/// Severity recorded by [`MemoryLog`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Error,
}

/// Keeps every line in memory.
#[derive(Debug, Default)]
pub struct MemoryLog {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines.lock().clone()
    }

    /// Messages logged at the given level, in order.
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|(_, m)| m.contains(needle))
    }
}

impl ReplayLog for MemoryLog {
    fn info(&self, message: &str) {
        self.lines.lock().push((LogLevel::Info, message.to_string()));
    }

    fn error(&self, message: &str) {
        self.lines.lock().push((LogLevel::Error, message.to_string()));
    }
}
