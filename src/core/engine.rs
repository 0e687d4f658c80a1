//! # Engine: the resolution runtime shared by requests, scripts and loaders.
//!
//! An [`Engine`] owns the module registry, the readiness scheduler, the module
//! path table and the two collaborators (script loader and fetch transport).
//! It is a cheap `Arc` handle; clones share all state.
//!
//! ## Request flow
//! ```text
//! request(["m1", "ajax:data.json::items"])
//!   │
//!   ├── parse specifiers ──► module names + selector chains (positional)
//!   ├── unseen plain name  ──► paths.url(name) ──► register ──► ScriptLoader::load(url)
//!   ├── unseen remote name ──► register ──► ajax(GET data.json) ──► settle(value)
//!   └── Request { deps, selectors }
//!         ├── run(cb)          ready? fire now : queue runner ──► Scheduler
//!         └── define(name, cb) ──► Registry::define ──► propagate ──► wake Scheduler
//! ```
//!
//! ## Example
//! ```rust
//! use modvisor::{Config, Engine};
//! use serde_json::json;
//!
//! let engine = Engine::new(Config::default());
//! engine.define("greeting", |_| Ok(json!({"text": "hello"}))).unwrap();
//!
//! engine
//!     .request(["greeting::text"])
//!     .unwrap()
//!     .run(|args| assert_eq!(args[0], json!("hello")))
//!     .unwrap();
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use serde_json::Value;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

use super::builder::EngineBuilder;
use super::registry::{Definition, ModuleStatus, Registry};
use super::request::Request;
use super::scheduler::{RunnerFn, Scheduler};
use crate::config::Config;
use crate::error::{BoxError, ResolveError};
use crate::events::{Bus, Event, EventKind};
use crate::loaders::{ModulePaths, ScriptLoader, Transport, remote};
use crate::specifier::Specifier;

/// Shared state behind an [`Engine`] handle.
pub(crate) struct Inner {
    pub(crate) cfg: Config,
    pub(crate) bus: Bus,
    pub(crate) registry: Arc<Registry>,
    pub(crate) scheduler: Arc<Scheduler>,
    pub(crate) paths: RwLock<ModulePaths>,
    pub(crate) scripts: Arc<dyn ScriptLoader>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) token: CancellationToken,
}

/// Handle to a dependency-resolution runtime.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

impl Engine {
    /// Engine with the default file transport, no scripts and no subscribers.
    pub fn new(cfg: Config) -> Self {
        EngineBuilder::new(cfg).build()
    }

    /// Starts configuring an engine.
    pub fn builder(cfg: Config) -> EngineBuilder {
        EngineBuilder::new(cfg)
    }

    pub(crate) fn from_inner(inner: Inner) -> Self {
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Declares dependencies and triggers the load of every module seen for the
    /// first time.
    ///
    /// Names and selector chains are recorded in declaration order. A plain
    /// module without a path fails with [`ResolveError::UnknownModule`] and is
    /// not registered; a remote one outside of a Tokio runtime fails with
    /// [`ResolveError::NoRuntime`].
    pub fn request<I, S>(&self, specifiers: I) -> Result<Request, ResolveError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let protocol = self.inner.cfg.remote_protocol.as_str();
        let mut deps = Vec::new();
        let mut selectors = Vec::new();

        for raw in specifiers {
            let spec = Specifier::parse(raw.as_ref())?;
            let name = spec.module_name(protocol);
            self.ensure_loading(&spec, &name)?;
            deps.push(name);
            selectors.push(spec.selectors().to_vec());
        }
        Ok(Request::new(self.clone(), deps, selectors))
    }

    fn ensure_loading(&self, spec: &Specifier, name: &str) -> Result<(), ResolveError> {
        let registry = &self.inner.registry;
        if registry.contains(name) {
            return Ok(());
        }

        if spec.is_remote(&self.inner.cfg.remote_protocol) {
            if Handle::try_current().is_err() {
                return Err(ResolveError::NoRuntime {
                    module: name.to_string(),
                });
            }
            if registry.register(name) {
                self.publish_requested(name, spec.base());
                remote::load(self, name, spec.base());
            }
            return Ok(());
        }

        let url = self
            .path(name)
            .ok_or_else(|| ResolveError::UnknownModule {
                name: name.to_string(),
            })?;
        if registry.register(name) {
            self.publish_requested(name, &url);
            self.inner.scripts.load(&url, self);
        }
        Ok(())
    }

    fn publish_requested(&self, name: &str, url: &str) {
        self.inner.bus.publish(
            Event::new(EventKind::ModuleRequested)
                .with_module(name)
                .with_url(url),
        );
    }

    /// Defines a module without dependencies.
    ///
    /// Returns `Ok(false)` if `name` was already defined.
    pub fn define<F>(&self, name: &str, callback: F) -> Result<bool, ResolveError>
    where
        F: FnOnce(Vec<Value>) -> Result<Value, BoxError> + Send + 'static,
    {
        self.define_module(name, Vec::new(), Vec::new(), Box::new(callback))
    }

    pub(crate) fn define_module(
        &self,
        name: &str,
        deps: Vec<String>,
        selectors: Vec<Vec<String>>,
        definition: Definition,
    ) -> Result<bool, ResolveError> {
        let outcome = self
            .inner
            .registry
            .define(name, deps, selectors, definition);
        self.inner.scheduler.wake();
        outcome
    }

    /// Resolves a requested module with an externally produced value.
    ///
    /// Returns `Ok(false)` if the module already has a definition or a value.
    pub fn settle(&self, name: &str, value: Value) -> Result<bool, ResolveError> {
        let outcome = self.inner.registry.settle(name, value);
        self.inner.scheduler.wake();
        outcome
    }

    pub(crate) fn selected_args(
        &self,
        deps: &[String],
        selectors: &[Vec<String>],
    ) -> Result<Option<Vec<Value>>, ResolveError> {
        self.inner.registry.collect_args(deps, selectors)
    }

    pub(crate) fn schedule(
        &self,
        deps: Vec<String>,
        selectors: Vec<Vec<String>>,
        callback: RunnerFn,
    ) -> u64 {
        self.inner.scheduler.enqueue(deps, selectors, callback)
    }

    pub(crate) fn fire_now(&self, callback: RunnerFn, args: Vec<Value>) -> u64 {
        self.inner.scheduler.fire_now(callback, args)
    }

    /// True if `name` has a definition (or was settled).
    pub fn exists(&self, name: &str) -> bool {
        self.inner.registry.is_defined(name)
    }

    /// True if `name` holds a value.
    pub fn is_resolved(&self, name: &str) -> bool {
        self.status(name) == Some(ModuleStatus::Resolved)
    }

    /// Resolved value of `name`.
    pub fn value(&self, name: &str) -> Option<Value> {
        self.inner.registry.value(name)
    }

    /// Lifecycle status of `name`, `None` if never requested.
    pub fn status(&self, name: &str) -> Option<ModuleStatus> {
        self.inner.registry.status(name)
    }

    /// Sorted names of known modules that have no value yet.
    pub fn unresolved(&self) -> Vec<String> {
        self.inner.registry.unresolved()
    }

    /// Registers the script URL of a plain module.
    pub fn set_path(&self, name: impl Into<String>, url: impl Into<String>) {
        self.inner
            .paths
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name, url);
    }

    /// Script URL of `name`, base path applied.
    pub fn path(&self, name: &str) -> Option<String> {
        self.inner
            .paths
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .url(name)
    }

    /// Asks the script loader for `url` (once per URL).
    pub fn load_script(&self, url: &str) {
        self.inner.scripts.load(url, self);
    }

    /// Number of queued runners.
    pub fn pending_runners(&self) -> usize {
        self.inner.scheduler.len()
    }

    /// Runs one scheduler pass now. Returns how many runners fired.
    ///
    /// Outside of a Tokio runtime this is the only way queued runners fire.
    pub fn poll_pending(&self) -> usize {
        self.inner.scheduler.poll_once()
    }

    /// Engine configuration.
    pub fn config(&self) -> &Config {
        &self.inner.cfg
    }

    /// Event bus for subscribing to engine events.
    pub fn bus(&self) -> &Bus {
        &self.inner.bus
    }

    /// Transport used for remote resources.
    pub fn transport(&self) -> Arc<dyn Transport> {
        Arc::clone(&self.inner.transport)
    }

    pub(crate) fn cancellation(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    /// Stops the polling loop, drops queued runners and cancels in-flight
    /// scripts and fetches. Resolved modules stay readable.
    pub fn shutdown(&self) {
        self.inner.token.cancel();
        self.inner.scheduler.clear();
    }

    /// True after [`Engine::shutdown`].
    pub fn is_shut_down(&self) -> bool {
        self.inner.token.is_cancelled()
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("cfg", &self.inner.cfg)
            .field("pending_runners", &self.pending_runners())
            .field("transport", &self.inner.transport.name())
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

static GLOBAL: OnceLock<Engine> = OnceLock::new();

/// Process-wide engine with the default configuration.
pub fn global() -> &'static Engine {
    GLOBAL.get_or_init(|| Engine::new(Config::default()))
}

/// [`Engine::request`] on the [`global`] engine.
pub fn using<I, S>(specifiers: I) -> Result<Request, ResolveError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    global().request(specifiers)
}
