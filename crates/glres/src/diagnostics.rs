//! Process-wide message sink shared by every resource manager.

use std::sync::{Arc, Mutex, MutexGuard};

/// Receives informational and error messages.
///
/// Sinks without a dedicated error channel only implement `log`; `error`
/// then falls back to it so failures are always observable.
pub trait Diagnostics: Send + Sync {
    fn log(&self, message: &str);

    fn error(&self, message: &str) {
        self.log(message);
    }
}

/// Default sink: forwards to `tracing` under the `glres` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn log(&self, message: &str) {
        tracing::info!(target: "glres", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "glres", "{message}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Log,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticEntry {
    pub severity: Severity,
    pub message: String,
}

/// Sink that keeps every message in memory.
///
/// Clones share storage, so a caller can hand one clone to a
/// [`crate::GpuContext`] and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryDiagnostics {
    entries: Arc<Mutex<Vec<DiagnosticEntry>>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<DiagnosticEntry> {
        self.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(Severity::Error)
    }

    pub fn logs(&self) -> Vec<String> {
        self.messages(Severity::Log)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn messages(&self, severity: Severity) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|entry| entry.severity == severity)
            .map(|entry| entry.message.clone())
            .collect()
    }

    fn push(&self, severity: Severity, message: &str) {
        self.lock().push(DiagnosticEntry {
            severity,
            message: message.to_string(),
        });
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DiagnosticEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn log(&self, message: &str) {
        self.push(Severity::Log, message);
    }

    fn error(&self, message: &str) {
        self.push(Severity::Error, message);
    }
}
