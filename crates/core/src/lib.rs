#![warn(clippy::unwrap_used)]

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod types;

pub use config::{AccountHitTypes, Settings, SettingsStore, Transport};
pub use diagnostics::{Diagnostic, DiagnosticSink, Severity};
pub use error::{BridgeError, BridgeResult};
pub use types::{Command, FieldMap, FieldValue, HitCallback, HitType};
