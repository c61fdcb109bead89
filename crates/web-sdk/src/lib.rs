//! Analytics dispatch adaptor: normalises pageviews, events, exceptions,
//! timings, user properties and ecommerce transactions into commands for
//! either the modern function-call protocol or the legacy command-queue
//! protocol, with optional replication to additional tracking accounts.
//!
//! # Modules
//!
//! - [`events`]: Canonical hit, transaction and exception types
//! - [`custom_data`]: Custom dimension/metric extraction
//! - [`host`]: Host environment contract and an in-memory recording host
//! - [`detect`]: One-shot backend detection
//! - [`translator`]: Track calls to validated canonical hits
//! - [`adaptors`]: Protocol adaptors (modern, legacy)
//! - [`replication`]: Fan-out to additional accounts
//! - [`tracker`]: Public track operations
//! - [`registry`]: Handler registration contract

#![warn(clippy::unwrap_used)]

pub mod adaptors;
pub mod custom_data;
pub mod detect;
pub mod events;
pub mod host;
pub mod registry;
pub mod replication;
pub mod tracker;
pub mod translator;

pub use adaptors::{CommandAdaptor, Protocol};
pub use custom_data::custom_data;
pub use detect::{detect_backend, AnalyticsBackend};
pub use events::{ExceptionReport, HitDescriptor, Product, Transaction};
pub use host::{HostEnvironment, PageLocation, RecordingHost};
pub use registry::{AnalyticsRegistry, HandlerTable};
pub use tracker::GaTracker;
