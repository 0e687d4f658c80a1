//! Error types used by the modvisor engine and its loaders.
//!
//! This module defines two error enums:
//!
//! - [`ResolveError`]: errors raised while requesting, defining or resolving modules.
//! - [`FetchError`]: errors raised by a [`Transport`](crate::Transport) for one remote fetch.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logs/events.
//! Warnings (duplicate definitions, empty results) are not errors: they are
//! published on the event bus and resolution carries on.

use std::time::Duration;

use serde_json::{Value, json};
use thiserror::Error;

use crate::loaders::Response;

/// Boxed error returned by definition callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// # Errors produced by the resolution engine.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ResolveError {
    /// A plain module was requested but the path table has no location for it.
    #[error("unknown module '{name}'")]
    UnknownModule {
        /// Requested module name.
        name: String,
    },

    /// A selector was applied to a value that is not an object or an array.
    #[error("module '{module}' has no property '{path}'")]
    Shape {
        /// Module whose value was being selected into.
        module: String,
        /// Remaining (unreachable) selector path, joined with `::`.
        path: String,
    },

    /// A definition callback returned an error.
    #[error("definition of module '{module}' failed: {source}")]
    Definition {
        /// Module being defined.
        module: String,
        /// Error returned by the callback.
        #[source]
        source: BoxError,
    },

    /// Accepting a definition would close a dependency cycle.
    #[error("circular dependency: {}", chain.join(" -> "))]
    Cycle {
        /// The cycle, starting and ending with the rejected module.
        chain: Vec<String>,
    },

    /// The specifier string could not be parsed.
    #[error("invalid specifier '{specifier}': {reason}")]
    InvalidSpecifier {
        /// Raw specifier.
        specifier: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// A remote load was requested outside of a Tokio runtime.
    #[error("module '{module}' needs a tokio runtime to load")]
    NoRuntime {
        /// Module that could not be loaded.
        module: String,
    },
}

impl ResolveError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    ///
    /// # Example
    /// ```
    /// use modvisor::ResolveError;
    ///
    /// let err = ResolveError::UnknownModule { name: "m1".into() };
    /// assert_eq!(err.as_label(), "unknown_module");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ResolveError::UnknownModule { .. } => "unknown_module",
            ResolveError::Shape { .. } => "selector_shape",
            ResolveError::Definition { .. } => "definition_failed",
            ResolveError::Cycle { .. } => "dependency_cycle",
            ResolveError::InvalidSpecifier { .. } => "invalid_specifier",
            ResolveError::NoRuntime { .. } => "no_runtime",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ResolveError::UnknownModule { name } => format!("unknown module: {name}"),
            ResolveError::Shape { module, path } => {
                format!("shape: module={module} unreachable={path}")
            }
            ResolveError::Definition { module, source } => {
                format!("definition: module={module} error={source}")
            }
            ResolveError::Cycle { chain } => format!("cycle: {}", chain.join(" -> ")),
            ResolveError::InvalidSpecifier { specifier, reason } => {
                format!("specifier: {specifier:?} {reason}")
            }
            ResolveError::NoRuntime { module } => format!("no runtime: module={module}"),
        }
    }

    /// Module name the error is about, if any.
    pub fn module(&self) -> Option<&str> {
        match self {
            ResolveError::UnknownModule { name } => Some(name),
            ResolveError::Shape { module, .. }
            | ResolveError::Definition { module, .. }
            | ResolveError::NoRuntime { module } => Some(module),
            ResolveError::Cycle { chain } => chain.first().map(String::as_str),
            ResolveError::InvalidSpecifier { .. } => None,
        }
    }
}

/// # Errors produced by a single remote fetch.
///
/// Delivered to the fetch's own error handler only. The remote resource adapter
/// still settles the module with [`FetchError::response_value`].
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum FetchError {
    /// The transport answered with a non-success status.
    #[error("request to {} failed with status {}", response.url, response.status)]
    Status {
        /// The full response, body included.
        response: Response,
    },

    /// The transport failed before producing a status.
    #[error("request to {url} failed: {error}")]
    Transport {
        /// Requested URL.
        url: String,
        /// Underlying error message.
        error: String,
    },

    /// The request was aborted after reaching its timeout.
    #[error("connection has reached the timeout of {} ms", timeout.as_millis())]
    Timeout {
        /// Requested URL.
        url: String,
        /// The timeout that was exceeded.
        timeout: Duration,
    },
}

impl FetchError {
    /// Returns a short stable label (snake_case) for use in logs/events.
    pub fn as_label(&self) -> &'static str {
        match self {
            FetchError::Status { .. } => "fetch_status",
            FetchError::Transport { .. } => "fetch_transport",
            FetchError::Timeout { .. } => "fetch_timeout",
        }
    }

    /// Requested URL.
    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { response } => &response.url,
            FetchError::Transport { url, .. } | FetchError::Timeout { url, .. } => url,
        }
    }

    /// Value a failed remote resource resolves to.
    ///
    /// Same shape as [`Response::to_value`] with `ok: false` and an `error` field.
    pub fn response_value(&self) -> Value {
        let (status, body) = match self {
            FetchError::Status { response } => (json!(response.status), json!(response.body)),
            _ => (Value::Null, Value::Null),
        };
        json!({
            "url": self.url(),
            "status": status,
            "ok": false,
            "body": body,
            "error": self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_message_joins_chain() {
        let err = ResolveError::Cycle {
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "circular dependency: a -> b -> a");
        assert_eq!(err.module(), Some("a"));
    }

    #[test]
    fn shape_error_names_remaining_path() {
        let err = ResolveError::Shape {
            module: "module3".into(),
            path: "foo::bar".into(),
        };
        assert_eq!(err.to_string(), "module 'module3' has no property 'foo::bar'");
        assert_eq!(err.as_label(), "selector_shape");
    }

    #[test]
    fn status_failure_keeps_response_in_value() {
        let err = FetchError::Status {
            response: Response {
                url: "data.json".into(),
                status: 404,
                body: "missing".into(),
            },
        };
        let value = err.response_value();
        assert_eq!(value["status"], 404);
        assert_eq!(value["ok"], false);
        assert_eq!(value["body"], "missing");
        assert_eq!(err.url(), "data.json");
    }

    #[test]
    fn timeout_value_has_no_status() {
        let err = FetchError::Timeout {
            url: "slow.json".into(),
            timeout: Duration::from_millis(50),
        };
        let value = err.response_value();
        assert!(value["status"].is_null());
        assert_eq!(value["error"], "connection has reached the timeout of 50 ms");
    }
}
