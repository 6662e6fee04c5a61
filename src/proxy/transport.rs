//! Forwarding authenticated requests to backend services.
//!
//! # Responsibilities
//! - Define the seam between the gateway core and the byte-forwarding engine
//! - Provide a hyper-based forwarder that resolves `lb://{service}` through a URL template
//!
//! # Design Decisions
//! - The request handed to a transport already carries the stripped path (`/api/{svc}` removed)
//! - Connection failures surface as 502 with a fixed reason; the cause travels in
//!   the error and is logged once by the translator
//! - Headers pass through unchanged except `Host`, which the client derives from the target

use std::str::FromStr;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, uri::PathAndQuery, Request, StatusCode, Uri},
    response::Response,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::error::GatewayError;
use crate::routing::RouteEntry;

/// Anything that can deliver a request to the service behind a route.
#[async_trait]
pub trait ProxyTransport: Send + Sync {
    async fn forward(&self, route: &RouteEntry, request: Request<Body>) -> Result<Response, GatewayError>;
}

/// Plain HTTP forwarder built on the hyper legacy client.
#[derive(Clone)]
pub struct HttpForwarder {
    client: Client<HttpConnector, Body>,
    url_template: String,
}

impl HttpForwarder {
    pub fn new(url_template: impl Into<String>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Self {
            client,
            url_template: url_template.into(),
        }
    }

    /// Absolute upstream URI for `route` and the already-stripped `path_and_query`.
    pub fn upstream_uri(&self, route: &RouteEntry, path_and_query: &str) -> Result<Uri, GatewayError> {
        let base = self
            .url_template
            .replace("{service}", &route.service.to_lowercase());
        let base = Uri::from_str(&base)
            .map_err(|e| GatewayError::Internal(format!("bad upstream base '{}': {}", base, e)))?;

        let base_path = base.path().trim_end_matches('/');
        let joined = format!("{}{}", base_path, path_and_query);
        let path_and_query = PathAndQuery::from_str(&joined)
            .map_err(|e| GatewayError::Internal(format!("bad upstream path '{}': {}", joined, e)))?;

        let mut parts = base.into_parts();
        parts.path_and_query = Some(path_and_query);
        Uri::from_parts(parts).map_err(|e| GatewayError::Internal(e.to_string()))
    }
}

#[async_trait]
impl ProxyTransport for HttpForwarder {
    async fn forward(&self, route: &RouteEntry, request: Request<Body>) -> Result<Response, GatewayError> {
        let (mut parts, body) = request.into_parts();
        let path_and_query = parts
            .uri
            .path_and_query()
            .map(PathAndQuery::as_str)
            .unwrap_or("/")
            .to_string();
        parts.uri = self.upstream_uri(route, &path_and_query)?;
        parts.headers.remove(header::HOST);

        tracing::trace!(service = %route.service, uri = %parts.uri, "Forwarding request");

        match self.client.request(Request::from_parts(parts, body)).await {
            Ok(response) => {
                let (parts, body) = response.into_parts();
                Ok(Response::from_parts(parts, Body::new(body)))
            }
            Err(e) => Err(GatewayError::upstream_with_cause(
                StatusCode::BAD_GATEWAY,
                "upstream request failed",
                format!("{}: {}", route.service, e),
            )),
        }
    }
}
