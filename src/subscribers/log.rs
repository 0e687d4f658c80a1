//! # LogWriter: event renderer on top of `tracing`
//!
//! A subscriber that turns incoming [`Event`]s into `tracing` records, so the
//! host application's `tracing` subscriber decides where they go.
//!
//! ## Levels
//! ```text
//! debug  module-requested / module-defined / module-resolved / runner-* / script-load
//! warn   duplicate-definition / empty-result / fetch-failed / subscriber-overflow
//! error  definition-failed / cycle / runner-failed / runner-panicked / script-failed
//! ```

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let module = e.module.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::ModuleRequested => {
                debug!(seq = e.seq, module, url = ?e.url, "module requested");
            }
            EventKind::ModuleDefined => debug!(seq = e.seq, module, "module defined"),
            EventKind::ModuleResolved => debug!(seq = e.seq, module, "module resolved"),
            EventKind::RunnerQueued => debug!(seq = e.seq, runner = ?e.runner, "runner queued"),
            EventKind::RunnerFired => debug!(seq = e.seq, runner = ?e.runner, "runner fired"),
            EventKind::ScriptLoadRequested => {
                debug!(seq = e.seq, url = ?e.url, "script load requested");
            }
            EventKind::DuplicateDefinition => {
                warn!(seq = e.seq, module, "module is already defined");
            }
            EventKind::EmptyResult => warn!(seq = e.seq, module, "module returned nothing"),
            EventKind::FetchFailed => {
                warn!(seq = e.seq, module, url = ?e.url, reason, "remote fetch failed");
            }
            EventKind::SubscriberOverflow => {
                warn!(seq = e.seq, subscriber = module, reason, "subscriber dropped event");
            }
            EventKind::DefinitionFailed => {
                error!(seq = e.seq, module, reason, "module definition failed");
            }
            EventKind::CycleDetected => {
                error!(seq = e.seq, module, reason, "circular dependency rejected");
            }
            EventKind::RunnerFailed => {
                error!(seq = e.seq, runner = ?e.runner, module, reason, "runner dropped");
            }
            EventKind::RunnerPanicked => {
                error!(seq = e.seq, runner = ?e.runner, reason, "runner panicked");
            }
            EventKind::ScriptFailed => {
                error!(seq = e.seq, url = ?e.url, reason, "script failed");
            }
            EventKind::SubscriberPanicked => {
                error!(seq = e.seq, subscriber = module, reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
