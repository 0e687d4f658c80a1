//! Filesystem transport: serves remote resources from a root directory.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::fetch::{FetchRequest, HTTP_STATUS_OK, Method, Response, Transport};
use crate::error::FetchError;

const HTTP_STATUS_NOT_FOUND: u16 = 404;
const HTTP_STATUS_METHOD_NOT_ALLOWED: u16 = 405;

/// Reads `GET`/`HEAD` targets relative to `root` with `tokio::fs`.
///
/// Query strings and fragments are ignored; a missing file answers `404`.
#[derive(Clone, Debug)]
pub struct FileTransport {
    root: PathBuf,
}

impl FileTransport {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = url.split(['?', '#']).next().unwrap_or_default();
        self.root.join(path.trim_start_matches('/'))
    }
}

impl Default for FileTransport {
    fn default() -> Self {
        Self::new(".")
    }
}

#[async_trait]
impl Transport for FileTransport {
    async fn send(&self, request: &FetchRequest) -> Result<Response, FetchError> {
        let respond = |status: u16, body: String| Response {
            url: request.url.clone(),
            status,
            body,
        };

        if !matches!(request.method, Method::Get | Method::Head) {
            return Ok(respond(HTTP_STATUS_METHOD_NOT_ALLOWED, String::new()));
        }

        match tokio::fs::read_to_string(self.resolve(&request.url)).await {
            Ok(_) if request.method == Method::Head => Ok(respond(HTTP_STATUS_OK, String::new())),
            Ok(body) => Ok(respond(HTTP_STATUS_OK, body)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Ok(respond(HTTP_STATUS_NOT_FOUND, String::new()))
            }
            Err(e) => Err(FetchError::Transport {
                url: request.url.clone(),
                error: e.to_string(),
            }),
        }
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
