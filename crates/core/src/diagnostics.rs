//! Diagnostic sink: where advisory text about dropped or rejected hits goes.
//!
//! Tracking failures never interrupt the host application. Components accept
//! an `Arc<dyn DiagnosticSink>` and report validation failures, unsupported
//! operations and a missing backend through it instead of returning errors.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Notice,
    Warning,
}

/// One advisory message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: &'static str,
    pub message: String,
}

impl From<&BridgeError> for Diagnostic {
    fn from(err: &BridgeError) -> Self {
        let severity = match err {
            BridgeError::Configuration(_) => Severity::Notice,
            _ => Severity::Warning,
        };
        Diagnostic {
            severity,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Receives advisory diagnostics.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Default sink: forwards every diagnostic to `tracing`.
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Notice => info!(kind = diagnostic.kind, "{}", diagnostic.message),
            Severity::Warning => warn!(kind = diagnostic.kind, "{}", diagnostic.message),
        }
    }
}

/// Sink that drops everything.
pub struct NoOpSink;

impl DiagnosticSink for NoOpSink {
    fn report(&self, _diagnostic: Diagnostic) {}
}

/// In-memory sink that captures diagnostics for testing.
#[derive(Default)]
pub struct CaptureSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.diagnostics.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.diagnostics.lock().len()
    }

    pub fn count_kind(&self, kind: &str) -> usize {
        self.diagnostics
            .lock()
            .iter()
            .filter(|d| d.kind == kind)
            .count()
    }

    pub fn clear(&self) {
        self.diagnostics.lock().clear();
    }
}

impl DiagnosticSink for CaptureSink {
    fn report(&self, diagnostic: Diagnostic) {
        self.diagnostics.lock().push(diagnostic);
    }
}

pub fn tracing_sink() -> Arc<dyn DiagnosticSink> {
    Arc::new(TracingSink)
}

pub fn noop_sink() -> Arc<dyn DiagnosticSink> {
    Arc::new(NoOpSink)
}

pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_sink() {
        let sink = capture_sink();
        assert_eq!(sink.count(), 0);

        sink.report(Diagnostic::from(&BridgeError::Validation(
            "transaction is missing an id".into(),
        )));
        sink.report(Diagnostic::from(&BridgeError::Unsupported(
            "set on classic".into(),
        )));

        assert_eq!(sink.count(), 2);
        assert_eq!(sink.count_kind("validation"), 1);
        assert_eq!(sink.count_kind("unsupported"), 1);
        assert_eq!(
            sink.diagnostics()[0].message,
            "Validation error: transaction is missing an id"
        );

        sink.report(Diagnostic::from(&BridgeError::Configuration(
            "no backend".into(),
        )));
        assert_eq!(sink.diagnostics()[2].severity, Severity::Notice);

        sink.clear();
        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn test_noop_sink() {
        let sink = noop_sink();
        // Should not panic
        sink.report(Diagnostic {
            severity: Severity::Notice,
            kind: "configuration",
            message: "nothing detected".into(),
        });
    }
}
