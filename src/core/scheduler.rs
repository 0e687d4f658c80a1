//! # Readiness scheduler for pending runners.
//!
//! A `run` callback whose dependencies are not resolved yet becomes a *runner*
//! and waits here. The scheduler re-checks pending runners in passes and fires
//! the ones whose dependencies are all resolved.
//!
//! ## Polling loop
//! ```text
//! wake() ──► in flight? ── yes ──► notify (early pass)
//!               │ no
//!               ▼
//!         spawn poll_loop ──► pass ──► pending empty? ── yes ──► exit (flag cleared)
//!                              ▲             │ no
//!                              │             ▼
//!                              └── sleep(poll_interval) | notified | cancelled
//! ```
//!
//! ## Rules
//! - At most one polling loop is in flight (atomic guard). The guard is also
//!   released when the loop task is dropped, e.g. by a runtime shutting down.
//! - A pass fires runners in insertion order; kept runners stay ahead of runners
//!   queued during the pass.
//! - A fired runner is removed before its callback runs.
//! - A runner whose selector fails is dropped (`RunnerFailed`).
//! - A panicking runner is reported (`RunnerPanicked`) and the loop carries on.
//! - Without a Tokio runtime nothing is spawned; call [`Scheduler::poll_once`].

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use super::registry::Registry;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::panic_message;

/// Runner callback: receives the selected dependency values in declaration order.
pub type RunnerFn = Box<dyn FnOnce(Vec<Value>) + Send + 'static>;

struct Runner {
    id: u64,
    deps: Vec<String>,
    selectors: Vec<Vec<String>>,
    callback: RunnerFn,
}

/// Pending runners plus the polling loop that fires them.
pub struct Scheduler {
    pending: Mutex<Vec<Runner>>,
    in_flight: AtomicBool,
    notify: Notify,
    next_id: AtomicU64,
    interval: Duration,
    registry: Arc<Registry>,
    bus: Bus,
    token: CancellationToken,
}

impl Scheduler {
    pub fn new(
        registry: Arc<Registry>,
        bus: Bus,
        interval: Duration,
        token: CancellationToken,
    ) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            in_flight: AtomicBool::new(false),
            notify: Notify::new(),
            next_id: AtomicU64::new(1),
            interval,
            registry,
            bus,
            token,
        }
    }

    fn pending(&self) -> MutexGuard<'_, Vec<Runner>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of runners waiting for their dependencies.
    pub fn len(&self) -> usize {
        self.pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending().is_empty()
    }

    /// Queues a runner and wakes the polling loop. Returns the runner id.
    pub fn enqueue(
        self: &Arc<Self>,
        deps: Vec<String>,
        selectors: Vec<Vec<String>>,
        callback: RunnerFn,
    ) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.pending().push(Runner {
            id,
            deps,
            selectors,
            callback,
        });
        self.bus
            .publish(Event::new(EventKind::RunnerQueued).with_runner(id));
        self.wake();
        id
    }

    /// Requests a pass soon: notifies the running loop or starts a new one.
    pub fn wake(self: &Arc<Self>) {
        if self.in_flight.load(Ordering::Acquire) {
            self.notify.notify_one();
            return;
        }
        if self.token.is_cancelled() || self.is_empty() {
            return;
        }
        let Ok(handle) = Handle::try_current() else {
            return;
        };
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.notify.notify_one();
            return;
        }

        let this = Arc::clone(self);
        handle.spawn(async move { this.poll_loop().await });
    }

    async fn poll_loop(self: Arc<Self>) {
        let mut guard = InFlight::new(Arc::clone(&self));
        loop {
            self.poll_once();

            if self.is_empty() {
                self.in_flight.store(false, Ordering::Release);
                // A runner queued after the check above saw the flag still set.
                let reclaimed = !self.is_empty()
                    && self
                        .in_flight
                        .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                        .is_ok();
                if !reclaimed {
                    // The flag may already belong to a newer loop.
                    guard.disarm();
                    return;
                }
                continue;
            }

            tokio::select! {
                _ = self.token.cancelled() => return,
                _ = self.notify.notified() => {}
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }

    /// Fires `callback` right away, outside the pending queue.
    ///
    /// Shares the event and panic reporting of queued runners.
    pub(crate) fn fire_now(&self, callback: RunnerFn, args: Vec<Value>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.fire(id, callback, args);
        id
    }

    /// Runs one pass over the pending runners. Returns how many fired.
    pub fn poll_once(&self) -> usize {
        let drained = std::mem::take(&mut *self.pending());
        if drained.is_empty() {
            return 0;
        }

        let mut kept = Vec::with_capacity(drained.len());
        let mut fired = 0;
        for runner in drained {
            match self.registry.collect_args(&runner.deps, &runner.selectors) {
                Ok(Some(args)) => {
                    self.fire(runner.id, runner.callback, args);
                    fired += 1;
                }
                Ok(None) => kept.push(runner),
                Err(err) => {
                    let mut ev = Event::new(EventKind::RunnerFailed)
                        .with_runner(runner.id)
                        .with_reason(err.to_string());
                    if let Some(module) = err.module() {
                        ev = ev.with_module(module);
                    }
                    self.bus.publish(ev);
                }
            }
        }

        if !kept.is_empty() {
            let mut pending = self.pending();
            kept.append(&mut pending);
            *pending = kept;
        }
        fired
    }

    fn fire(&self, id: u64, callback: RunnerFn, args: Vec<Value>) {
        self.bus
            .publish(Event::new(EventKind::RunnerFired).with_runner(id));
        if let Err(payload) = std::panic::catch_unwind(AssertUnwindSafe(move || callback(args))) {
            self.bus.publish(
                Event::new(EventKind::RunnerPanicked)
                    .with_runner(id)
                    .with_reason(panic_message(payload.as_ref())),
            );
        }
    }

    /// Drops every pending runner. Returns how many were dropped.
    pub fn clear(&self) -> usize {
        std::mem::take(&mut *self.pending()).len()
    }
}

/// Clears the in-flight flag when the loop task ends, including when it is
/// dropped mid-await.
struct InFlight {
    scheduler: Arc<Scheduler>,
    armed: bool,
}

impl InFlight {
    fn new(scheduler: Arc<Scheduler>) -> Self {
        Self {
            scheduler,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.armed {
            self.scheduler.in_flight.store(false, Ordering::Release);
        }
    }
}
