//! Backend detection: which command protocol the host has installed.
//!
//! Detection runs once when the tracker is built. A backend that shows up
//! afterwards is not picked up; the host must install its analytics snippet
//! before constructing the tracker.

use tracing::info;

use crate::adaptors::legacy::LegacyAdaptor;
use crate::adaptors::modern::ModernAdaptor;
use crate::adaptors::{CommandAdaptor, Protocol};
use crate::host::HostEnvironment;

/// The resolved backend capability.
pub enum AnalyticsBackend {
    Modern(ModernAdaptor),
    Legacy(LegacyAdaptor),
    None,
}

impl AnalyticsBackend {
    pub fn protocol(&self) -> Option<Protocol> {
        self.adaptor().map(|adaptor| adaptor.protocol())
    }

    pub fn adaptor(&self) -> Option<&dyn CommandAdaptor> {
        match self {
            AnalyticsBackend::Modern(adaptor) => Some(adaptor),
            AnalyticsBackend::Legacy(adaptor) => Some(adaptor),
            AnalyticsBackend::None => None,
        }
    }
}

/// Probe the host. A command queue selects the legacy protocol; a namespace
/// pointer that resolves to a callable selects the modern protocol and takes
/// precedence when both are present.
pub fn detect_backend(host: &dyn HostEnvironment) -> AnalyticsBackend {
    let mut backend = AnalyticsBackend::None;

    if let Some(queue) = host.command_queue() {
        backend = AnalyticsBackend::Legacy(LegacyAdaptor::new(queue));
    }

    if let Some(namespace) = host.global_namespace() {
        if let Some(function) = host.resolve_function(&namespace) {
            backend = AnalyticsBackend::Modern(ModernAdaptor::new(namespace, function));
        }
    }

    match backend.protocol() {
        Some(protocol) => info!(%protocol, "analytics backend detected"),
        None => info!("no analytics backend detected"),
    }
    backend
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::host::RecordingHost;

    #[test]
    fn test_modern_detected() {
        let host = RecordingHost::new().with_universal("ga");
        assert_eq!(detect_backend(&host).protocol(), Some(Protocol::Modern));
    }

    #[test]
    fn test_custom_namespace() {
        let host = RecordingHost::new().with_universal("__gaTracker");
        match detect_backend(&host) {
            AnalyticsBackend::Modern(adaptor) => assert_eq!(adaptor.namespace(), "__gaTracker"),
            _ => panic!("expected modern backend"),
        }
    }

    #[test]
    fn test_legacy_detected_from_empty_queue() {
        let host = RecordingHost::new().with_classic_queue();
        assert_eq!(detect_backend(&host).protocol(), Some(Protocol::Legacy));
    }

    #[test]
    fn test_modern_wins_over_legacy() {
        let host = RecordingHost::new().with_classic_queue().with_universal("ga");
        assert_eq!(detect_backend(&host).protocol(), Some(Protocol::Modern));
    }

    #[test]
    fn test_namespace_without_callable() {
        let host = RecordingHost::new().with_namespace("ga");
        assert!(detect_backend(&host).protocol().is_none());

        let host = RecordingHost::new().with_namespace("ga").with_classic_queue();
        assert_eq!(detect_backend(&host).protocol(), Some(Protocol::Legacy));
    }

    #[test]
    fn test_nothing_detected() {
        let host = RecordingHost::new();
        assert!(matches!(detect_backend(&host), AnalyticsBackend::None));
    }
}
