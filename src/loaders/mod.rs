//! # Loaders: how unseen modules get defined.
//!
//! - plain modules: [`ModulePaths`] gives the URL, a [`ScriptLoader`] runs it;
//! - remote resources: the remote adapter fetches through a [`Transport`] and
//!   settles the module with the response.
//!
//! Transports:
//! - [`FileTransport`]: files under a root directory (`tokio::fs`), the default;
//! - `HttpTransport`: `reqwest` client, behind the `http` feature.

mod fetch;
mod file;
#[cfg(feature = "http")]
mod http;
mod paths;
pub(crate) mod remote;
mod script;

pub use fetch::{
    CACHE_BUST_PARAM, FetchRequest, HTTP_STATUS_OK, Method, RequestHandle, Response, Transport,
    ajax, send,
};
pub use file::FileTransport;
#[cfg(feature = "http")]
pub use http::HttpTransport;
pub use paths::ModulePaths;
pub use script::{ScriptFn, ScriptLoader, Scripts};
