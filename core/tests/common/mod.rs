//! Shared helpers for integration tests.
//!
//! `RouterTransport` sends requests straight into the mock server's router
//! instead of over a socket. The `Host` header is taken from the request URL,
//! so the mock server sees `search.twitter.com`, `upload.twitter.com`, etc.
//! exactly as the real API would, without any DNS involved.

use axum::body::Body;
use axum::http::{header, Request};
use chirp_core::{
    Client, ClientConfig, Credential, HttpRequest, HttpResponse, RequestBody, Transport,
    TransportError,
};
use http_body_util::BodyExt;
use tower::ServiceExt;

pub struct RouterTransport {
    router: axum::Router,
    runtime: tokio::runtime::Runtime,
}

impl RouterTransport {
    pub fn new() -> Self {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        Self {
            router: mock_server::app(),
            runtime,
        }
    }
}

impl Transport for RouterTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let url = url::Url::parse(&request.full_url()).map_err(|e| TransportError::new(e.to_string()))?;
        let host = url.host_str().unwrap_or_default();
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let mut uri = url.path().to_string();
        if let Some(query) = url.query() {
            uri.push('?');
            uri.push_str(query);
        }

        let mut builder = Request::builder()
            .method(request.method.as_str())
            .uri(uri)
            .header(header::HOST, authority);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let body = request
            .body
            .as_ref()
            .map(RequestBody::to_bytes)
            .unwrap_or_default();
        let http_request = builder
            .body(Body::from(body))
            .map_err(|e| TransportError::new(e.to_string()))?;

        let router = self.router.clone();
        self.runtime.block_on(async move {
            let response = router
                .oneshot(http_request)
                .await
                .unwrap_or_else(|never| match never {});
            let status = response.status().as_u16();
            let body = response
                .into_body()
                .collect()
                .await
                .map_err(|e| TransportError::new(e.to_string()))?
                .to_bytes()
                .to_vec();
            Ok(HttpResponse {
                status,
                headers: Vec::new(),
                body,
            })
        })
    }
}

/// A client wired to a fresh mock server.
pub fn mock_client(credential: Credential) -> Client {
    Client::with_transport(credential, ClientConfig::new(), RouterTransport::new()).unwrap()
}
