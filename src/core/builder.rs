use std::sync::{Arc, RwLock};

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use super::engine::{Engine, Inner};
use super::registry::Registry;
use super::scheduler::Scheduler;
use crate::{
    config::Config,
    events::Bus,
    loaders::{FileTransport, ModulePaths, ScriptLoader, Scripts, Transport},
    subscribers::{Subscribe, SubscriberSet},
};

/// Builder for constructing an [`Engine`] with optional collaborators.
pub struct EngineBuilder {
    cfg: Config,
    subscribers: Vec<Arc<dyn Subscribe>>,
    transport: Option<Arc<dyn Transport>>,
    scripts: Option<Arc<dyn ScriptLoader>>,
    paths: ModulePaths,
}

impl EngineBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
            transport: None,
            scripts: None,
            paths: ModulePaths::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive engine events (definitions, resolutions, runner and
    /// loader activity) through dedicated workers with bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Sets the transport used for remote resources (default: [`FileTransport`]
    /// rooted at the working directory).
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets the script loader used for plain modules (default: empty [`Scripts`]).
    pub fn with_scripts(mut self, scripts: Arc<dyn ScriptLoader>) -> Self {
        self.scripts = Some(scripts);
        self
    }

    /// Replaces the module path table.
    pub fn with_paths(mut self, paths: ModulePaths) -> Self {
        self.paths = paths;
        self
    }

    /// Registers the script URL of one module.
    pub fn with_path(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        self.paths.insert(name, url);
        self
    }

    /// Builds the engine.
    ///
    /// # Panics
    /// With subscribers configured this must be called from within a Tokio
    /// runtime (one worker task per subscriber is spawned).
    pub fn build(self) -> Engine {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let token = CancellationToken::new();

        if !self.subscribers.is_empty() {
            let subs = SubscriberSet::new(self.subscribers, bus.clone());
            subscriber_listener(&bus, subs, token.clone());
        }

        let registry = Arc::new(Registry::new(bus.clone()));
        let scheduler = Arc::new(Scheduler::new(
            Arc::clone(&registry),
            bus.clone(),
            self.cfg.poll_interval_clamped(),
            token.clone(),
        ));

        Engine::from_inner(Inner {
            transport: self
                .transport
                .unwrap_or_else(|| Arc::new(FileTransport::default())),
            scripts: self.scripts.unwrap_or_else(|| Arc::new(Scripts::new())),
            paths: RwLock::new(self.paths),
            cfg: self.cfg,
            bus,
            registry,
            scheduler,
            token,
        })
    }
}

/// Forwards bus events to the subscriber set until the engine shuts down.
fn subscriber_listener(bus: &Bus, set: SubscriberSet, token: CancellationToken) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => set.emit(&ev),
                    Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => break,
                },
            }
        }
        set.shutdown().await;
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Event, EventKind};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;
    use tokio::sync::mpsc::{self, UnboundedSender};

    struct Forward(UnboundedSender<(EventKind, Option<String>)>);

    #[async_trait]
    impl Subscribe for Forward {
        async fn on_event(&self, event: &Event) {
            let _ = self
                .0
                .send((event.kind, event.module.as_deref().map(str::to_string)));
        }
    }

    #[tokio::test]
    async fn subscribers_see_engine_events() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let engine = Engine::builder(Config::default())
            .with_subscribers(vec![Arc::new(Forward(tx))])
            .build();

        engine.define("m", |_| Ok(json!(1))).unwrap();

        let mut seen = Vec::new();
        while seen.len() < 2 {
            let item = tokio::time::timeout(Duration::from_secs(1), rx.recv())
                .await
                .unwrap()
                .unwrap();
            seen.push(item);
        }
        assert_eq!(
            seen,
            vec![
                (EventKind::ModuleDefined, Some("m".to_string())),
                (EventKind::ModuleResolved, Some("m".to_string())),
            ]
        );
        engine.shutdown();
    }

    #[test]
    fn builds_without_runtime_when_no_subscribers() {
        let engine = Engine::builder(Config::default())
            .with_paths([("a", "a.js")].into_iter().collect())
            .with_transport(Arc::new(FileTransport::new("/srv")))
            .build();

        assert_eq!(engine.path("a").as_deref(), Some("a.js"));
        assert_eq!(engine.transport().name(), "file");
    }
}
