//! HTTP transport on top of `reqwest` (feature `http`).

use async_trait::async_trait;

use super::fetch::{FetchRequest, Method, Response, Transport};
use crate::error::FetchError;

/// Sends requests with a shared `reqwest::Client`.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses a preconfigured client (proxies, TLS, default headers, ...).
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Delete => reqwest::Method::DELETE,
        Method::Head => reqwest::Method::HEAD,
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: &FetchRequest) -> Result<Response, FetchError> {
        let transport_err = |e: reqwest::Error| FetchError::Transport {
            url: request.url.clone(),
            error: e.to_string(),
        };

        let mut builder = self.client.request(method(request.method), &request.url);
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(transport_err)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(transport_err)?;

        Ok(Response {
            url: request.url.clone(),
            status,
            body,
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_every_method() {
        assert_eq!(method(Method::Get), reqwest::Method::GET);
        assert_eq!(method(Method::Head), reqwest::Method::HEAD);
        assert_eq!(method(Method::Delete), reqwest::Method::DELETE);
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() {
        let transport = HttpTransport::new();
        let err = transport
            .send(&FetchRequest::get("http://127.0.0.1:9/nothing.json"))
            .await
            .unwrap_err();
        assert_eq!(err.as_label(), "fetch_transport");
    }
}
