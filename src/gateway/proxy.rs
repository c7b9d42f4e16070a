// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Streaming request forwarder.
//!
//! Request and response bodies are piped as streams in both directions;
//! neither is collected into memory. Dropping the handler future (client
//! went away) drops the in-flight backend request with it.

use std::time::{Duration, Instant};

use axum::{
    body::{Body, HttpBody},
    http::{header, HeaderMap, HeaderName},
    response::Response,
};
use tracing::{debug, warn};

use super::error::GatewayError;
use super::interceptors::RequestContext;

/// Headers that describe a single connection and are never forwarded.
const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

/// Remove hop-by-hop headers, including any listed in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
}

/// Sends prepared requests to backends and relays the responses.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    response_timeout: Duration,
}

impl Forwarder {
    /// `connect_timeout` bounds connection setup; `response_timeout` bounds
    /// the wait for the backend's response head. Body transfer is not
    /// time-limited so long downloads and uploads keep streaming.
    pub fn new(connect_timeout: Duration, response_timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .tcp_keepalive(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            response_timeout,
        })
    }

    pub async fn forward(&self, ctx: RequestContext, body: Body) -> Result<Response, GatewayError> {
        let route = ctx.route.as_ref().ok_or(GatewayError::RouteNotFound)?;
        let url = route.upstream_url(ctx.uri.path(), ctx.uri.query());
        let prefix = route.prefix().to_string();

        let mut request = self.client.request(ctx.method.clone(), url).headers(ctx.headers);
        if body.size_hint().exact() != Some(0) {
            request = request.body(reqwest::Body::wrap_stream(body.into_data_stream()));
        }

        let started = Instant::now();
        let upstream = match tokio::time::timeout(self.response_timeout, request.send()).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) if e.is_timeout() => {
                warn!(route = %prefix, error = %e, "Upstream request timed out");
                return Err(GatewayError::UpstreamTimeout);
            }
            Ok(Err(e)) => {
                warn!(route = %prefix, error = %e, "Upstream request failed");
                return Err(GatewayError::UpstreamUnavailable);
            }
            Err(_) => {
                warn!(
                    route = %prefix,
                    timeout_ms = self.response_timeout.as_millis() as u64,
                    "Upstream response timed out"
                );
                return Err(GatewayError::UpstreamTimeout);
            }
        };

        debug!(
            route = %prefix,
            method = %ctx.method,
            status = upstream.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Upstream responded"
        );

        let mut builder = Response::builder().status(upstream.status());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(upstream.headers().iter().map(|(name, value)| (name.clone(), value.clone())));
            strip_hop_by_hop(headers);
        }

        builder
            .body(Body::from_stream(upstream.bytes_stream()))
            .map_err(|e| {
                warn!(route = %prefix, error = %e, "Failed to build proxied response");
                GatewayError::UpstreamUnavailable
            })
    }
}
