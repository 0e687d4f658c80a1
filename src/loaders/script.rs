//! # Script collaborator.
//!
//! A [`ScriptLoader`] is asked to load the URL of a plain module. Loading is a
//! side effect: the script is expected to define the module on the engine it
//! receives.
//!
//! [`Scripts`] is the in-process implementation: a table of URL → closure.
//!
//! ## Rules
//! - A URL is loaded at most once (loaded or in flight), whatever the outcome.
//! - Inside a Tokio runtime the script runs as a spawned task; without one it
//!   runs inline before `load` returns.
//! - An unknown URL, an error or a panic publishes `ScriptFailed`.

use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tokio::runtime::Handle;

use crate::core::Engine;
use crate::error::ResolveError;
use crate::events::{Event, EventKind};
use crate::subscribers::panic_message;

/// Loads the code behind a module URL.
pub trait ScriptLoader: Send + Sync + 'static {
    /// Starts loading `url`; the loaded code defines modules on `engine`.
    fn load(&self, url: &str, engine: &Engine);
}

/// Script body: defines one or more modules on the engine.
pub type ScriptFn = Arc<dyn Fn(&Engine) -> Result<(), ResolveError> + Send + Sync + 'static>;

/// In-process script table.
#[derive(Default)]
pub struct Scripts {
    table: RwLock<HashMap<String, ScriptFn>>,
    loaded: Mutex<HashSet<String>>,
}

impl Scripts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a script (builder style).
    pub fn with_script<F>(self, url: impl Into<String>, script: F) -> Self
    where
        F: Fn(&Engine) -> Result<(), ResolveError> + Send + Sync + 'static,
    {
        self.insert(url, script);
        self
    }

    /// Adds or replaces the script served for `url`.
    pub fn insert<F>(&self, url: impl Into<String>, script: F)
    where
        F: Fn(&Engine) -> Result<(), ResolveError> + Send + Sync + 'static,
    {
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.into(), Arc::new(script));
    }

    /// True once `url` was handed to [`ScriptLoader::load`].
    pub fn is_loaded(&self, url: &str) -> bool {
        self.loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(url)
    }

    fn script(&self, url: &str) -> Option<ScriptFn> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }
}

impl ScriptLoader for Scripts {
    fn load(&self, url: &str, engine: &Engine) {
        let first = self
            .loaded
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.to_string());
        if !first {
            return;
        }

        engine
            .bus()
            .publish(Event::new(EventKind::ScriptLoadRequested).with_url(url));

        let Some(script) = self.script(url) else {
            script_failed(engine, url, "no script registered for this url".to_string());
            return;
        };

        let engine = engine.clone();
        let url = url.to_string();
        match Handle::try_current() {
            Ok(handle) => {
                let token = engine.cancellation();
                handle.spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => {}
                        _ = tokio::task::yield_now() => execute(&script, &engine, &url),
                    }
                });
            }
            Err(_) => execute(&script, &engine, &url),
        }
    }
}

fn execute(script: &ScriptFn, engine: &Engine, url: &str) {
    match std::panic::catch_unwind(AssertUnwindSafe(|| script(engine))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => script_failed(engine, url, err.to_string()),
        Err(payload) => script_failed(engine, url, panic_message(payload.as_ref())),
    }
}

fn script_failed(engine: &Engine, url: &str, reason: String) {
    engine.bus().publish(
        Event::new(EventKind::ScriptFailed)
            .with_url(url)
            .with_reason(reason),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn engine_with(scripts: Arc<Scripts>) -> Engine {
        Engine::builder(Config::default())
            .with_scripts(scripts)
            .with_path("m1", "m1.js")
            .build()
    }

    #[test]
    fn each_url_loads_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&runs);
        let scripts = Arc::new(Scripts::new().with_script("m1.js", move |_: &Engine| {
            r.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        let engine = engine_with(Arc::clone(&scripts));

        engine.load_script("m1.js");
        engine.load_script("m1.js");
        engine.request(["m1"]).unwrap();

        assert!(scripts.is_loaded("m1.js"));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn missing_script_is_reported() {
        let engine = engine_with(Arc::new(Scripts::new()));
        let mut rx = engine.bus().subscribe();

        engine.request(["m1"]).unwrap();

        let failed = std::iter::from_fn(|| rx.try_recv().ok())
            .find(|e| e.kind == EventKind::ScriptFailed)
            .expect("script failure event");
        assert_eq!(failed.url.as_deref(), Some("m1.js"));
    }

    #[test]
    fn script_error_is_reported() {
        let scripts = Scripts::new().with_script("m1.js", |engine: &Engine| {
            engine.request(["not-configured"])?;
            Ok(())
        });
        let engine = engine_with(Arc::new(scripts));
        let mut rx = engine.bus().subscribe();

        engine.load_script("m1.js");

        let failed = std::iter::from_fn(|| rx.try_recv().ok())
            .find(|e| e.kind == EventKind::ScriptFailed)
            .expect("script failure event");
        assert_eq!(
            failed.reason.as_deref(),
            Some("unknown module 'not-configured'")
        );
    }

    #[tokio::test]
    async fn script_runs_as_a_task_inside_runtime() {
        let scripts = Scripts::new().with_script("m1.js", |engine: &Engine| {
            engine.define("m1", |_| Ok(json!("loaded")))?;
            Ok(())
        });
        let engine = engine_with(Arc::new(scripts));

        engine.request(["m1"]).unwrap();
        assert!(!engine.is_resolved("m1"));

        tokio::time::timeout(Duration::from_secs(1), async {
            while !engine.is_resolved("m1") {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
        assert_eq!(engine.value("m1"), Some(json!("loaded")));
    }
}
