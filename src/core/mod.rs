//! Runtime core: registry, scheduler and the engine facade.
//!
//! Internal modules:
//! - [`registry`]: module states, dependency graph, propagation and cycle detection;
//! - [`scheduler`]: pending runners and the polling loop that fires them;
//! - [`engine`]: the shared runtime handle and the process-wide engine;
//! - [`request`]: `run` / `define` on a set of declared dependencies;
//! - [`builder`]: engine construction and subscriber wiring.

mod builder;
mod engine;
mod registry;
mod request;
mod scheduler;

pub use builder::EngineBuilder;
pub use engine::{Engine, global, using};
pub use registry::{Definition, ModuleStatus};
pub use request::Request;
pub use scheduler::RunnerFn;
