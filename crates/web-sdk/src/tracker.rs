//! Public tracker: the track operations a host calls, wired through
//! translation, the detected backend and account replication.
//!
//! No operation returns an error. Validation failures and unsupported
//! operations are reported to the diagnostic sink and the call dispatches
//! nothing.

use ga_bridge_core::diagnostics::{tracing_sink, Diagnostic, DiagnosticSink};
use ga_bridge_core::{BridgeError, BridgeResult, FieldMap, SettingsStore};
use std::sync::Arc;
use tracing::debug;

use crate::adaptors::Protocol;
use crate::detect::{detect_backend, AnalyticsBackend};
use crate::events::{ExceptionReport, HitDescriptor, Transaction};
use crate::host::HostEnvironment;
use crate::replication::replicate;
use crate::translator;

pub struct GaTracker {
    host: Arc<dyn HostEnvironment>,
    backend: AnalyticsBackend,
    settings: SettingsStore,
    sink: Arc<dyn DiagnosticSink>,
}

impl GaTracker {
    pub fn new(host: Arc<dyn HostEnvironment>, settings: SettingsStore) -> Self {
        Self::with_diagnostics(host, settings, tracing_sink())
    }

    /// Build a tracker reporting diagnostics to `sink`. The backend is
    /// detected here, once.
    pub fn with_diagnostics(
        host: Arc<dyn HostEnvironment>,
        settings: SettingsStore,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let backend = detect_backend(host.as_ref());
        if backend.protocol().is_none() {
            sink.report(Diagnostic::from(&BridgeError::Configuration(
                "neither the modern nor the legacy analytics backend was detected; all tracking calls will be ignored".into(),
            )));
        }
        Self {
            host,
            backend,
            settings,
            sink,
        }
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn protocol(&self) -> Option<Protocol> {
        self.backend.protocol()
    }

    pub fn page_track(&self, path: &str, properties: &FieldMap) {
        if self.settings.current().disable_page_tracking {
            debug!(path, "page tracking disabled");
            return;
        }
        self.dispatch(translator::pageview_hit(path, properties));
    }

    pub fn event_track(&self, action: &str, properties: &FieldMap) {
        if self.settings.current().disable_event_tracking {
            debug!(action, "event tracking disabled");
            return;
        }
        let hit = translator::event_hit(action, properties, &self.host.location());
        self.dispatch_all(hit.map(|hit| vec![hit]));
    }

    /// `cause` is accepted for registry compatibility and not transmitted.
    pub fn exception_track(&self, error: &ExceptionReport, cause: Option<&str>) {
        if let Some(cause) = cause {
            debug!(cause, "exception cause not forwarded");
        }
        self.dispatch(translator::exception_hit(error, &self.host.location()));
    }

    pub fn set_username(&self, user_id: &str) {
        self.settings.set_user_id(user_id);
    }

    pub fn set_user_properties(&self, properties: Option<&FieldMap>) {
        if let Some(properties) = properties {
            self.dispatch(translator::user_properties_hit(properties));
        }
    }

    pub fn user_timings(&self, properties: &FieldMap) {
        let hit = translator::timing_hit(properties, &self.host.location());
        self.dispatch_all(hit.map(|hit| vec![hit]));
    }

    pub fn transaction_track(&self, transaction: &Transaction) {
        self.dispatch_all(translator::transaction_hits(transaction));
    }

    fn dispatch_all(&self, hits: BridgeResult<Vec<HitDescriptor>>) {
        match hits {
            Ok(hits) => hits.into_iter().for_each(|hit| self.dispatch(hit)),
            Err(err) => self.report(&err),
        }
    }

    /// Translate, replicate and hand one hit to the backend. Settings are
    /// read fresh for every hit.
    ///
    /// Replication is gated on the hit type as requested, before any
    /// protocol rewrite, so an enhanced ecommerce send stays under the
    /// ecommerce toggle.
    fn dispatch(&self, hit: HitDescriptor) {
        let Some(adaptor) = self.backend.adaptor() else {
            return;
        };
        let settings = self.settings.current();
        let gate = hit.hit_type;
        let hit = translator::resolve_for(adaptor.protocol(), hit, &settings, &self.host.location());

        let commands = match adaptor.translate(&hit, &settings) {
            Ok(commands) => commands,
            Err(err) => return self.report(&err),
        };

        for base in commands {
            for command in replicate(base, gate, &settings) {
                debug!(command = %command.name, hit_type = %hit.hit_type, "dispatching command");
                adaptor.dispatch(command);
            }
        }
    }

    fn report(&self, err: &BridgeError) {
        self.sink.report(Diagnostic::from(err));
    }
}
