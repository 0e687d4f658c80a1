//! # modvisor
//!
//! **Modvisor** is an asynchronous dependency-resolution engine.
//!
//! Callers declare named dependencies (modules, remote resources, or nested
//! properties of already-loaded values). A callback registered with
//! [`Request::run`] runs exactly once, only after every declared dependency has
//! resolved, and receives the resolved values in declaration order.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   request(["m1", "m2::foo", "ajax:data.json"])
//!          │
//!          ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Engine (shared runtime handle)                                   │
//! │  - Registry   (module states, dependents, propagation)            │
//! │  - Scheduler  (pending runners, polling loop)                     │
//! │  - ModulePaths + ScriptLoader   (plain modules)                   │
//! │  - Transport + remote adapter   (ajax: resources)                 │
//! │  - Bus        (broadcast events)                                  │
//! └──────┬───────────────────────┬──────────────────────┬─────────────┘
//!        ▼                       ▼                      ▼
//!  ScriptLoader::load(url)   ajax(GET path)       Scheduler::wake()
//!        │                       │                      │
//!        └─► define(name) ──┐    └─► settle(name) ──┐   │
//!                           ▼                       ▼   ▼
//!                    Registry: resolve + propagate ──► runners fire
//!                           │
//!                           ▼ publishes
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                   (capacity: Config::bus_capacity)                │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       │   (spawned by build)   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                          (per-sub queues)
//!                        ┌──────────┼──────────┐
//!                        ▼          ▼          ▼
//!                    LogWriter    sub2       subN
//! ```
//!
//! ### Module lifecycle
//! ```text
//! Requested ──► Waiting ──► Evaluating ──► Resolved(value)
//!     │                          └───────► Failed
//!     └── settle (remote) ───────────────► Resolved(value)
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                         |
//! |-------------------|---------------------------------------------------------------|--------------------------------------------|
//! | **Requests**      | Declare dependencies, run callbacks, define modules.          | [`Engine`], [`Request`], [`using`]         |
//! | **Selectors**     | `module::key::0` access into resolved values.                 | [`select`], [`Specifier`]                  |
//! | **Loaders**       | Script table, path table, fetch transports.                   | [`ScriptLoader`], [`Transport`], [`ajax`]  |
//! | **Subscriber API**| Hook into engine events (logging, custom subscribers).        | [`Subscribe`], [`LogWriter`]               |
//! | **Errors**        | Typed errors for resolution and fetches.                      | [`ResolveError`], [`FetchError`]           |
//! | **Configuration** | Centralize runtime settings.                                  | [`Config`]                                 |
//!
//! ## Optional features
//! - `http`: exports [`HttpTransport`] (`reqwest`) for remote resources.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use modvisor::{Config, Engine, LogWriter, Scripts, Subscribe};
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scripts = Scripts::new().with_script("config.js", |engine: &Engine| {
//!         engine.define("config", |_| Ok(json!({"db": {"port": 5432}})))?;
//!         Ok(())
//!     });
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
//!     let engine = Engine::builder(Config::default())
//!         .with_subscribers(subs)
//!         .with_scripts(Arc::new(scripts))
//!         .with_path("config", "config.js")
//!         .build();
//!
//!     let (tx, rx) = tokio::sync::oneshot::channel();
//!     engine.request(["config::db::port"])?.run(move |args| {
//!         let _ = tx.send(args[0].clone());
//!     })?;
//!
//!     assert_eq!(rx.await?, json!(5432));
//!     engine.shutdown();
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod loaders;
mod selector;
mod specifier;
mod subscribers;

// ---- Public re-exports ----

pub use config::{Config, DEFAULT_POLL_INTERVAL, DEFAULT_REMOTE_PROTOCOL};
pub use crate::core::{
    Definition, Engine, EngineBuilder, ModuleStatus, Request, RunnerFn, global, using,
};
pub use error::{BoxError, FetchError, ResolveError};
pub use events::{Bus, Event, EventKind};
pub use loaders::{
    CACHE_BUST_PARAM, FetchRequest, FileTransport, HTTP_STATUS_OK, Method, ModulePaths,
    RequestHandle, Response, ScriptFn, ScriptLoader, Scripts, Transport, ajax, send,
};
pub use selector::{SELECTOR_SEPARATOR, select};
pub use specifier::Specifier;
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};

// Optional: HTTP transport for remote resources.
// Enable with: `--features http`
#[cfg(feature = "http")]
pub use loaders::HttpTransport;
