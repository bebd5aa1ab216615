//! One forwarding attempt against one backend.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the backend's scheme/authority, keeping
//!   method, path, query, and body
//! - Strip hop-by-hop headers in both directions
//! - Apply operator extra headers after the standard ones
//! - Classify transport failures as connect, write, or read
//!
//! # Design Decisions
//! - No per-attempt timeout; the orchestration-level retry budget is the
//!   effective ceiling
//! - The response body is relayed as a stream, never buffered
//! - Connection reuse is delegated to the transport

use std::collections::HashSet;

use axum::body::{Body, Bytes};
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{header, request::Parts, HeaderMap, HeaderName, HeaderValue, Request, Response, Uri};
use hyper_util::client::legacy::{self, connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use thiserror::Error;
use url::{Position, Url};

use crate::config::validation::ValidationError;

/// Headers meaningful only for one transport leg; removed in both directions.
const HOP_BY_HOP_HEADERS: [&str; 9] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP_HEADERS
        .iter()
        .any(|h| name.eq_ignore_ascii_case(h))
}

fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}

/// A failed attempt, classified by the transport phase that broke.
/// A non-success status produced by the backend is a response, not an error.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connecting to backend: {0}")]
    Connect(#[source] legacy::Error),

    #[error("writing request to backend: {0}")]
    Write(#[source] legacy::Error),

    #[error("reading response from backend: {0}")]
    Read(#[source] legacy::Error),

    #[error("building outbound request: {0}")]
    Request(#[from] axum::http::Error),
}

fn classify(err: legacy::Error) -> TransportError {
    if err.is_connect() {
        return TransportError::Connect(err);
    }
    let write_side = std::error::Error::source(&err)
        .and_then(|source| source.downcast_ref::<hyper::Error>())
        .map(|inner| inner.is_user() || inner.is_body_write_aborted() || inner.is_canceled());
    match write_side {
        Some(true) => TransportError::Write(err),
        _ => TransportError::Read(err),
    }
}

/// Forwarding engine bound to one backend address.
///
/// One instance per backend, reused across attempts; the underlying client
/// keeps its own connection pool.
#[derive(Debug)]
pub struct Forwarder {
    client: Client<HttpConnector, Body>,
    scheme: Scheme,
    authority: Authority,
}

impl Forwarder {
    pub fn new(base_url: &Url) -> Result<Self, ValidationError> {
        let authority_str = &base_url[Position::BeforeHost..Position::AfterPort];
        let authority =
            Authority::try_from(authority_str).map_err(|e| ValidationError::InvalidAddress {
                address: base_url.to_string(),
                reason: e.to_string(),
            })?;
        Ok(Self {
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
            scheme: Scheme::HTTP,
            authority,
        })
    }

    /// The host:port this forwarder targets.
    pub fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Perform exactly one attempt.
    ///
    /// `extra_headers` are applied after the standard headers so operator
    /// configuration can override them; an entry named `Host` rewrites the
    /// outbound Host. Repeated extra names append after the first override.
    pub async fn attempt(
        &self,
        parts: &Parts,
        extra_headers: &[(HeaderName, HeaderValue)],
        body: Bytes,
    ) -> Result<Response<Body>, TransportError> {
        let mut uri_parts = axum::http::uri::Parts::default();
        uri_parts.scheme = Some(self.scheme.clone());
        uri_parts.authority = Some(self.authority.clone());
        uri_parts.path_and_query = parts
            .uri
            .path_and_query()
            .cloned()
            .or_else(|| Some(PathAndQuery::from_static("/")));
        let uri = Uri::from_parts(uri_parts).map_err(axum::http::Error::from)?;

        let mut builder = Request::builder().method(parts.method.clone()).uri(uri);
        if let Some(headers) = builder.headers_mut() {
            for (name, value) in parts.headers.iter() {
                if !is_hop_by_hop(name.as_str()) {
                    headers.append(name.clone(), value.clone());
                }
            }
            // Recomputed by the client from the buffered body.
            headers.remove(header::CONTENT_LENGTH);
            headers.insert(
                header::HOST,
                HeaderValue::try_from(self.authority.as_str())
                    .map_err(axum::http::Error::from)?,
            );

            let mut overridden: HashSet<&HeaderName> = HashSet::new();
            for (name, value) in extra_headers {
                if overridden.insert(name) {
                    headers.insert(name.clone(), value.clone());
                } else {
                    headers.append(name.clone(), value.clone());
                }
            }
        }
        let req = builder.body(Body::from(body))?;

        let response = self.client.request(req).await.map_err(classify)?;
        let (mut resp_parts, incoming) = response.into_parts();
        strip_hop_by_hop(&mut resp_parts.headers);
        Ok(Response::from_parts(resp_parts, Body::new(incoming)))
    }
}
