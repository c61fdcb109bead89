//! Host environment contract (what the page around the tracker exposes)
//! and an in-memory [`RecordingHost`] that captures every backend call.

use ga_bridge_core::{Command, FieldValue};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

/// The modern protocol's global function.
pub trait UniversalFunction: Send + Sync {
    fn call(&self, command: Command);
}

/// The legacy protocol's global command queue.
pub trait CommandQueue: Send + Sync {
    fn push(&self, entry: Vec<FieldValue>);
}

/// Current page location as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageLocation {
    /// Fragment including its leading `#`, or empty.
    pub hash: String,
    pub pathname: String,
}

impl PageLocation {
    pub fn new(hash: impl Into<String>, pathname: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            pathname: pathname.into(),
        }
    }

    /// The fragment without its `#` when non-empty, else the path.
    pub fn current_page(&self) -> String {
        let fragment = self.hash.get(1..).unwrap_or_default();
        if fragment.is_empty() {
            self.pathname.clone()
        } else {
            fragment.to_string()
        }
    }
}

/// Capabilities the host page provides to the tracker.
pub trait HostEnvironment: Send + Sync {
    /// Name the modern snippet registered its global function under.
    fn global_namespace(&self) -> Option<String>;

    /// Resolve a global name to a callable, if it is one.
    fn resolve_function(&self, name: &str) -> Option<Arc<dyn UniversalFunction>>;

    /// The legacy command queue, if the host created one.
    fn command_queue(&self) -> Option<Arc<dyn CommandQueue>>;

    fn location(&self) -> PageLocation;
}

/// Universal function that records every call and fires the hit callback
/// carried in the field bag, as the real library does once a hit is sent.
#[derive(Default)]
pub struct RecordingFunction {
    calls: Mutex<Vec<Command>>,
}

impl RecordingFunction {
    pub fn calls(&self) -> Vec<Command> {
        self.calls.lock().clone()
    }
}

impl UniversalFunction for RecordingFunction {
    fn call(&self, command: Command) {
        let callback = match command.fields().and_then(|f| f.get("hitCallback")) {
            Some(FieldValue::Callback(callback)) => Some(callback.clone()),
            _ => None,
        };
        self.calls.lock().push(command);
        // lock released before re-entering host code
        if let Some(callback) = callback {
            callback.invoke();
        }
    }
}

/// Command queue that records every pushed entry.
#[derive(Default)]
pub struct RecordingQueue {
    entries: Mutex<Vec<Vec<FieldValue>>>,
}

impl RecordingQueue {
    pub fn entries(&self) -> Vec<Vec<FieldValue>> {
        self.entries.lock().clone()
    }
}

impl CommandQueue for RecordingQueue {
    fn push(&self, entry: Vec<FieldValue>) {
        self.entries.lock().push(entry);
    }
}

/// In-memory host for tests and the replay tool.
///
/// Backends can be installed at any time, including after a tracker has
/// already probed the host.
#[derive(Default)]
pub struct RecordingHost {
    namespace: RwLock<Option<String>>,
    function: RwLock<Option<(String, Arc<RecordingFunction>)>>,
    queue: RwLock<Option<Arc<RecordingQueue>>>,
    location: RwLock<PageLocation>,
}

impl RecordingHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a modern global function under `name` and point the
    /// namespace at it.
    pub fn with_universal(self, name: &str) -> Self {
        self.install_universal(name);
        self
    }

    /// Set the namespace pointer without necessarily defining the function.
    pub fn with_namespace(self, name: &str) -> Self {
        self.install_namespace(name);
        self
    }

    pub fn with_function(self, name: &str) -> Self {
        self.install_function(name);
        self
    }

    pub fn with_classic_queue(self) -> Self {
        self.install_classic_queue();
        self
    }

    pub fn with_location(self, location: PageLocation) -> Self {
        self.set_location(location);
        self
    }

    pub fn install_universal(&self, name: &str) {
        self.install_namespace(name);
        self.install_function(name);
    }

    pub fn install_namespace(&self, name: &str) {
        *self.namespace.write() = Some(name.to_string());
    }

    pub fn install_function(&self, name: &str) {
        *self.function.write() = Some((name.to_string(), Arc::new(RecordingFunction::default())));
    }

    pub fn install_classic_queue(&self) {
        *self.queue.write() = Some(Arc::new(RecordingQueue::default()));
    }

    pub fn set_location(&self, location: PageLocation) {
        *self.location.write() = location;
    }

    /// Calls made to the modern function, in order.
    pub fn universal_calls(&self) -> Vec<Command> {
        self.function
            .read()
            .as_ref()
            .map(|(_, f)| f.calls())
            .unwrap_or_default()
    }

    /// Entries pushed onto the legacy queue, in order.
    pub fn queue_entries(&self) -> Vec<Vec<FieldValue>> {
        self.queue
            .read()
            .as_ref()
            .map(|q| q.entries())
            .unwrap_or_default()
    }
}

impl HostEnvironment for RecordingHost {
    fn global_namespace(&self) -> Option<String> {
        self.namespace.read().clone()
    }

    fn resolve_function(&self, name: &str) -> Option<Arc<dyn UniversalFunction>> {
        self.function
            .read()
            .as_ref()
            .filter(|(registered, _)| registered == name)
            .map(|(_, f)| f.clone() as Arc<dyn UniversalFunction>)
    }

    fn command_queue(&self) -> Option<Arc<dyn CommandQueue>> {
        self.queue
            .read()
            .clone()
            .map(|q| q as Arc<dyn CommandQueue>)
    }

    fn location(&self) -> PageLocation {
        self.location.read().clone()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ga_bridge_core::HitCallback;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_current_page_prefers_fragment() {
        assert_eq!(PageLocation::new("#/abc", "/index.html").current_page(), "/abc");
        assert_eq!(PageLocation::new("", "/index.html").current_page(), "/index.html");
        assert_eq!(PageLocation::new("#", "/index.html").current_page(), "/index.html");
    }

    #[test]
    fn test_function_resolves_only_under_its_name() {
        let host = RecordingHost::new().with_namespace("ga").with_function("other");
        assert!(host.resolve_function("ga").is_none());
        assert!(host.resolve_function("other").is_some());
    }

    #[test]
    fn test_recording() {
        let host = RecordingHost::new().with_universal("ga").with_classic_queue();
        host.resolve_function("ga")
            .unwrap()
            .call(Command::new("send").arg("x"));
        host.command_queue()
            .unwrap()
            .push(vec![FieldValue::from("_trackTrans")]);

        assert_eq!(host.universal_calls().len(), 1);
        assert_eq!(host.queue_entries(), vec![vec![FieldValue::from("_trackTrans")]]);
    }

    #[test]
    fn test_backend_installed_after_construction() {
        let host = RecordingHost::new();
        assert!(host.command_queue().is_none());

        host.install_classic_queue();
        host.install_universal("ga");
        assert!(host.command_queue().is_some());
        assert_eq!(host.global_namespace().as_deref(), Some("ga"));
        assert!(host.resolve_function("ga").is_some());
    }

    #[test]
    fn test_function_fires_hit_callback() {
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let callback = HitCallback::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let function = RecordingFunction::default();
        let mut fields = ga_bridge_core::FieldMap::new();
        fields.insert("hitCallback".into(), callback.into());
        function.call(Command::new("send").arg(fields));
        function.call(Command::new("send").arg("no bag"));

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(function.calls().len(), 2);
    }
}
