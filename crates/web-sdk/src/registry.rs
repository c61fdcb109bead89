//! Handler registration: the hooks an analytics framework exposes for
//! provider plugins, and [`GaTracker::install`] to wire all of them.

use ga_bridge_core::FieldMap;
use std::sync::Arc;

use crate::events::{ExceptionReport, Transaction};
use crate::tracker::GaTracker;

pub type PageTrackFn = Box<dyn Fn(&str, &FieldMap) + Send + Sync>;
pub type EventTrackFn = Box<dyn Fn(&str, &FieldMap) + Send + Sync>;
pub type ExceptionTrackFn = Box<dyn Fn(&ExceptionReport, Option<&str>) + Send + Sync>;
pub type SetUsernameFn = Box<dyn Fn(&str) + Send + Sync>;
pub type SetUserPropertiesFn = Box<dyn Fn(Option<&FieldMap>) + Send + Sync>;
pub type UserTimingsFn = Box<dyn Fn(&FieldMap) + Send + Sync>;
pub type TransactionTrackFn = Box<dyn Fn(&Transaction) + Send + Sync>;

/// Registration points offered by the surrounding analytics framework.
pub trait AnalyticsRegistry {
    fn register_page_track(&mut self, handler: PageTrackFn);
    fn register_event_track(&mut self, handler: EventTrackFn);
    fn register_exception_track(&mut self, handler: ExceptionTrackFn);
    fn register_set_username(&mut self, handler: SetUsernameFn);
    fn register_set_user_properties(&mut self, handler: SetUserPropertiesFn);
    fn register_user_timings(&mut self, handler: UserTimingsFn);
    fn register_transaction_track(&mut self, handler: TransactionTrackFn);
}

impl GaTracker {
    /// Register every track operation of this tracker with `registry`.
    pub fn install(self: &Arc<Self>, registry: &mut dyn AnalyticsRegistry) {
        let t = Arc::clone(self);
        registry.register_page_track(Box::new(move |path: &str, props: &FieldMap| {
            t.page_track(path, props)
        }));
        let t = Arc::clone(self);
        registry.register_event_track(Box::new(move |action: &str, props: &FieldMap| {
            t.event_track(action, props)
        }));
        let t = Arc::clone(self);
        registry.register_exception_track(Box::new(
            move |error: &ExceptionReport, cause: Option<&str>| t.exception_track(error, cause),
        ));
        let t = Arc::clone(self);
        registry.register_set_username(Box::new(move |user_id: &str| t.set_username(user_id)));
        let t = Arc::clone(self);
        registry.register_set_user_properties(Box::new(move |props: Option<&FieldMap>| {
            t.set_user_properties(props)
        }));
        let t = Arc::clone(self);
        registry.register_user_timings(Box::new(move |props: &FieldMap| t.user_timings(props)));
        let t = Arc::clone(self);
        registry.register_transaction_track(Box::new(move |tx: &Transaction| {
            t.transaction_track(tx)
        }));
    }
}

/// Minimal registry that fans each call out to every registered handler.
#[derive(Default)]
pub struct HandlerTable {
    page_track: Vec<PageTrackFn>,
    event_track: Vec<EventTrackFn>,
    exception_track: Vec<ExceptionTrackFn>,
    set_username: Vec<SetUsernameFn>,
    set_user_properties: Vec<SetUserPropertiesFn>,
    user_timings: Vec<UserTimingsFn>,
    transaction_track: Vec<TransactionTrackFn>,
}

impl HandlerTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page_track(&self, path: &str, properties: &FieldMap) {
        self.page_track.iter().for_each(|h| h(path, properties));
    }

    pub fn event_track(&self, action: &str, properties: &FieldMap) {
        self.event_track.iter().for_each(|h| h(action, properties));
    }

    pub fn exception_track(&self, error: &ExceptionReport, cause: Option<&str>) {
        self.exception_track.iter().for_each(|h| h(error, cause));
    }

    pub fn set_username(&self, user_id: &str) {
        self.set_username.iter().for_each(|h| h(user_id));
    }

    pub fn set_user_properties(&self, properties: Option<&FieldMap>) {
        self.set_user_properties.iter().for_each(|h| h(properties));
    }

    pub fn user_timings(&self, properties: &FieldMap) {
        self.user_timings.iter().for_each(|h| h(properties));
    }

    pub fn transaction_track(&self, transaction: &Transaction) {
        self.transaction_track.iter().for_each(|h| h(transaction));
    }
}

impl AnalyticsRegistry for HandlerTable {
    fn register_page_track(&mut self, handler: PageTrackFn) {
        self.page_track.push(handler);
    }

    fn register_event_track(&mut self, handler: EventTrackFn) {
        self.event_track.push(handler);
    }

    fn register_exception_track(&mut self, handler: ExceptionTrackFn) {
        self.exception_track.push(handler);
    }

    fn register_set_username(&mut self, handler: SetUsernameFn) {
        self.set_username.push(handler);
    }

    fn register_set_user_properties(&mut self, handler: SetUserPropertiesFn) {
        self.set_user_properties.push(handler);
    }

    fn register_user_timings(&mut self, handler: UserTimingsFn) {
        self.user_timings.push(handler);
    }

    fn register_transaction_track(&mut self, handler: TransactionTrackFn) {
        self.transaction_track.push(handler);
    }
}
