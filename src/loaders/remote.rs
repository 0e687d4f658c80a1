//! Remote resource adapter: a zero-dependency module settled by one fetch.
//!
//! Success and failure both settle the module, so dependents always run; they
//! tell the two apart by the `ok` field of the value.

use serde_json::Value;

use super::fetch::{self, FetchRequest};
use crate::core::Engine;
use crate::events::{Event, EventKind};

/// Starts `GET path` for the remote module `name`.
///
/// The caller guarantees a Tokio runtime and that `name` was just registered.
pub(crate) fn load(engine: &Engine, name: &str, path: &str) {
    let cfg = engine.config();
    let request = FetchRequest::get(path)
        .with_timeout(cfg.fetch_timeout())
        .with_cache_bust(cfg.cache_bust)
        .with_cancel(engine.cancellation());

    let (ok_engine, ok_name) = (engine.clone(), name.to_string());
    let (err_engine, err_name) = (engine.clone(), name.to_string());

    fetch::ajax(
        engine.transport(),
        request,
        move |response| settle(&ok_engine, &ok_name, response.to_value()),
        move |err| {
            err_engine.bus().publish(
                Event::new(EventKind::FetchFailed)
                    .with_module(err_name.as_str())
                    .with_url(err.url())
                    .with_reason(err.to_string()),
            );
            settle(&err_engine, &err_name, err.response_value());
        },
    );
}

fn settle(engine: &Engine, name: &str, value: Value) {
    // Failures of dependents are published by the registry.
    let _ = engine.settle(name, value);
}
