//! # Fetch collaborator: transports and the `ajax` helper.
//!
//! A [`Transport`] turns a [`FetchRequest`] into a [`Response`]. [`ajax`] runs one
//! request on the Tokio runtime and routes the outcome to a success or an error
//! handler.
//!
//! ## Outcome routing
//! ```text
//! ajax(request)
//!   ├── cache busting: url?random=<f64>      (FetchRequest::cache_bust)
//!   ├── Transport::send ── timeout? ──► FetchError::Timeout  ──► on_error
//!   │        ├── Err(e)                ──► FetchError::*       ──► on_error
//!   │        ├── status != 200         ──► FetchError::Status  ──► on_error
//!   │        └── status == 200         ──► Response            ──► on_success
//!   └── cancelled                      ──► neither handler runs
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;

/// The only status routed to the success handler.
pub const HTTP_STATUS_OK: u16 = 200;

/// Name of the cache-busting query parameter.
pub const CACHE_BUST_PARAM: &str = "random";

/// Request method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Delete,
    Head,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One request handed to a [`Transport`].
#[derive(Clone, Debug)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    /// Request body (ignored by transports for `GET`/`HEAD`).
    pub body: Option<String>,
    /// Abort after this long and report [`FetchError::Timeout`].
    pub timeout: Option<Duration>,
    /// Append `random=<n>` to the URL.
    pub cache_bust: bool,
    /// Cancelling drops the request without calling either handler.
    pub cancel: Option<CancellationToken>,
}

impl FetchRequest {
    /// Builds a request with cache busting on and no timeout.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            body: None,
            timeout: None,
            cache_bust: true,
            cancel: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cache_bust(mut self, enabled: bool) -> Self {
        self.cache_bust = enabled;
        self
    }

    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// URL actually sent to the transport.
    pub fn target_url(&self) -> String {
        if !self.cache_bust {
            return self.url.clone();
        }
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!(
            "{}{sep}{CACHE_BUST_PARAM}={}",
            self.url,
            rand::random::<f64>()
        )
    }
}

/// A transport response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    /// Requested URL (without the cache-busting parameter).
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl Response {
    /// True for [`HTTP_STATUS_OK`].
    pub fn is_ok(&self) -> bool {
        self.status == HTTP_STATUS_OK
    }

    /// Value a remote resource resolves to.
    pub fn to_value(&self) -> Value {
        json!({
            "url": self.url,
            "status": self.status,
            "ok": self.is_ok(),
            "body": self.body,
        })
    }
}

/// Something that can perform a [`FetchRequest`].
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Performs the request. Any status is a successful send; routing by status
    /// is done by [`send`].
    async fn send(&self, request: &FetchRequest) -> Result<Response, FetchError>;

    /// Returns a stable name for logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Sends `request`, applying cache busting and the timeout, and maps non-200
/// statuses to [`FetchError::Status`].
pub async fn send(transport: &dyn Transport, request: &FetchRequest) -> Result<Response, FetchError> {
    let prepared = FetchRequest {
        url: request.target_url(),
        cancel: None,
        ..request.clone()
    };

    let attempt = transport.send(&prepared);
    let mut response = match request.timeout {
        Some(timeout) => tokio::time::timeout(timeout, attempt)
            .await
            .map_err(|_| FetchError::Timeout {
                url: request.url.clone(),
                timeout,
            })??,
        None => attempt.await?,
    };
    response.url.clone_from(&request.url);

    if response.is_ok() {
        Ok(response)
    } else {
        Err(FetchError::Status { response })
    }
}

/// Handle to an in-flight [`ajax`] request.
#[derive(Debug)]
pub struct RequestHandle {
    task: JoinHandle<()>,
}

impl RequestHandle {
    /// Aborts the request; neither handler runs if it has not finished yet.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Waits until a handler has run (or the request was aborted).
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

/// Runs `request` on the current Tokio runtime.
///
/// Exactly one of `on_success` / `on_error` runs, unless the request is
/// cancelled or aborted first.
///
/// # Panics
/// Must be called from within a Tokio runtime.
pub fn ajax<S, E>(
    transport: Arc<dyn Transport>,
    request: FetchRequest,
    on_success: S,
    on_error: E,
) -> RequestHandle
where
    S: FnOnce(Response) + Send + 'static,
    E: FnOnce(FetchError) + Send + 'static,
{
    let task = tokio::spawn(async move {
        let outcome = match request.cancel.clone() {
            Some(token) => tokio::select! {
                _ = token.cancelled() => return,
                outcome = send(transport.as_ref(), &request) => outcome,
            },
            None => send(transport.as_ref(), &request).await,
        };
        match outcome {
            Ok(response) => on_success(response),
            Err(err) => on_error(err),
        }
    });
    RequestHandle { task }
}
