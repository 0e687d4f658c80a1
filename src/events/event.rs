//! # Engine events emitted by the registry, scheduler and loaders.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Module events**: registration, definition, resolution and their warnings
//! - **Runner events**: queued, fired, failed
//! - **Loader events**: script and remote fetch activity
//! - **Subscriber events**: overflow and panics inside subscriber workers
//!
//! The [`Event`] struct carries metadata such as timestamps, module name,
//! runner id, URL and a human-readable reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use modvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::DuplicateDefinition)
//!     .with_module("module1")
//!     .with_reason("already defined");
//!
//! assert_eq!(ev.kind, EventKind::DuplicateDefinition);
//! assert_eq!(ev.module.as_deref(), Some("module1"));
//! assert!(ev.is_warning());
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of engine events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Module events ===
    /// A module was named for the first time and its load was triggered.
    ///
    /// Sets:
    /// - `module`: module name
    /// - `url`: script URL or remote path
    ModuleRequested,

    /// A definition was stored for a module.
    ///
    /// Sets:
    /// - `module`: module name
    ModuleDefined,

    /// A module received its value.
    ///
    /// Sets:
    /// - `module`: module name
    ModuleResolved,

    /// A second definition for an already defined module was ignored.
    ///
    /// Sets:
    /// - `module`: module name
    DuplicateDefinition,

    /// A definition callback produced `null`; the module is resolved anyway.
    ///
    /// Sets:
    /// - `module`: module name
    EmptyResult,

    /// A definition callback returned an error; the module will never resolve.
    ///
    /// Sets:
    /// - `module`: module name
    /// - `reason`: error message
    DefinitionFailed,

    /// A definition was rejected because it would close a dependency cycle.
    ///
    /// Sets:
    /// - `module`: rejected module name
    /// - `reason`: the cycle
    CycleDetected,

    // === Runner events ===
    /// A `run` callback could not fire immediately and was queued.
    ///
    /// Sets:
    /// - `runner`: runner id
    RunnerQueued,

    /// A runner fired (its callback ran with all dependencies resolved).
    ///
    /// Sets:
    /// - `runner`: runner id
    RunnerFired,

    /// A runner was dropped because selecting its arguments failed.
    ///
    /// Sets:
    /// - `runner`: runner id
    /// - `module`: module whose selector failed
    /// - `reason`: error message
    RunnerFailed,

    /// A runner callback panicked; the scheduler keeps going.
    ///
    /// Sets:
    /// - `runner`: runner id
    /// - `reason`: panic message
    RunnerPanicked,

    // === Loader events ===
    /// The script loader was asked for a URL.
    ///
    /// Sets:
    /// - `url`: script URL
    ScriptLoadRequested,

    /// A script could not be found or returned an error.
    ///
    /// Sets:
    /// - `url`: script URL
    /// - `reason`: error message
    ScriptFailed,

    /// A remote fetch finished with an error (the module still resolves).
    ///
    /// Sets:
    /// - `module`: remote module name
    /// - `url`: fetched path
    /// - `reason`: error message
    FetchFailed,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `module`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `module`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,
}

/// Engine event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Module (or subscriber) name, if applicable.
    pub module: Option<Arc<str>>,
    /// Runner id, if applicable.
    pub runner: Option<u64>,
    /// Script URL or fetched path, if applicable.
    pub url: Option<Arc<str>>,
    /// Human-readable reason (errors, warnings, overflow details).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            module: None,
            runner: None,
            url: None,
            reason: None,
        }
    }

    /// Attaches a module name.
    #[inline]
    pub fn with_module(mut self, module: impl Into<Arc<str>>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Attaches a runner id.
    #[inline]
    pub fn with_runner(mut self, id: u64) -> Self {
        self.runner = Some(id);
        self
    }

    /// Attaches a URL.
    #[inline]
    pub fn with_url(mut self, url: impl Into<Arc<str>>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_module(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_module(subscriber)
            .with_reason(info)
    }

    /// True for events that report something worth a warning but are not failures.
    #[inline]
    pub fn is_warning(&self) -> bool {
        matches!(
            self.kind,
            EventKind::DuplicateDefinition | EventKind::EmptyResult | EventKind::FetchFailed
        )
    }

    /// True for events that report a failure.
    #[inline]
    pub fn is_failure(&self) -> bool {
        matches!(
            self.kind,
            EventKind::DefinitionFailed
                | EventKind::CycleDetected
                | EventKind::RunnerFailed
                | EventKind::RunnerPanicked
                | EventKind::ScriptFailed
                | EventKind::SubscriberPanicked
        )
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::ModuleDefined);
        let b = Event::new(EventKind::ModuleResolved);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn overflow_event_names_subscriber() {
        let ev = Event::subscriber_overflow("log", "full");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.module.as_deref(), Some("log"));
        assert_eq!(ev.reason.as_deref(), Some("subscriber=log reason=full"));
    }

    #[test]
    fn classification() {
        assert!(Event::new(EventKind::EmptyResult).is_warning());
        assert!(Event::new(EventKind::CycleDetected).is_failure());
        assert!(!Event::new(EventKind::ModuleResolved).is_failure());
    }
}
