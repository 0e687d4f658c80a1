//! Dependency request returned by [`Engine::request`](crate::Engine::request).

use serde_json::Value;

use super::engine::Engine;
use crate::error::{BoxError, ResolveError};

/// Dependencies collected by one `request` call, in declaration order.
///
/// Both operations return `&Self` so they can be chained.
#[derive(Clone, Debug)]
pub struct Request {
    engine: Engine,
    deps: Vec<String>,
    selectors: Vec<Vec<String>>,
}

impl Request {
    pub(crate) fn new(engine: Engine, deps: Vec<String>, selectors: Vec<Vec<String>>) -> Self {
        Self {
            engine,
            deps,
            selectors,
        }
    }

    /// Module names, one per specifier.
    pub fn dependencies(&self) -> &[String] {
        &self.deps
    }

    /// Selector chains, parallel to [`Request::dependencies`].
    pub fn selectors(&self) -> &[Vec<String>] {
        &self.selectors
    }

    /// True if every dependency is resolved.
    pub fn is_ready(&self) -> bool {
        self.deps.iter().all(|dep| self.engine.is_resolved(dep))
    }

    /// Calls `callback` with the selected dependency values once all are resolved.
    ///
    /// Runs synchronously when they already are (always the case with no
    /// dependencies); otherwise a runner is queued on the scheduler. A selector
    /// error on the immediate attempt is returned. A panicking callback is
    /// reported as `RunnerPanicked` on either path and never reaches the caller.
    pub fn run<F>(&self, callback: F) -> Result<&Self, ResolveError>
    where
        F: FnOnce(Vec<Value>) + Send + 'static,
    {
        match self.engine.selected_args(&self.deps, &self.selectors)? {
            Some(args) => {
                self.engine.fire_now(Box::new(callback), args);
            }
            None => {
                self.engine
                    .schedule(self.deps.clone(), self.selectors.clone(), Box::new(callback));
            }
        }
        Ok(self)
    }

    /// Defines `name` as depending on this request's dependencies.
    ///
    /// A second definition of the same name is reported and ignored.
    pub fn define<F>(&self, name: &str, callback: F) -> Result<&Self, ResolveError>
    where
        F: FnOnce(Vec<Value>) -> Result<Value, BoxError> + Send + 'static,
    {
        self.engine.define_module(
            name,
            self.deps.clone(),
            self.selectors.clone(),
            Box::new(callback),
        )?;
        Ok(self)
    }
}
