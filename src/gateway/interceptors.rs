// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request interceptor stages.
//!
//! The gateway runs an ordered list of named stages over a
//! [`RequestContext`] before forwarding. Each stage either passes (possibly
//! mutating the context) or rejects with a terminal [`GatewayError`]; the
//! first rejection ends the request.
//!
//! Default order:
//!
//! 1. `resolve-route` - longest-prefix match, 404 when nothing serves the path
//! 2. `authenticate` - bearer verification on protected routes, 401 otherwise
//! 3. `forward-headers` - hop-by-hop cleanup and `X-Forwarded-*` headers

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::ConnectInfo,
    http::{header::HOST, request::Parts, HeaderMap, HeaderName, HeaderValue, Method, Uri},
};
use tracing::debug;

use super::error::GatewayError;
use super::proxy::strip_hop_by_hop;
use super::routes::{RouteRule, RouteTable};
use crate::auth::{bearer_token, AuthError, Claims, TokenCodec, TokenError};

/// Verified subject handed to backends. Always overwritten by the gateway.
pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
pub const FORWARDED_HOST_HEADER: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const FORWARDED_PROTO_HEADER: HeaderName = HeaderName::from_static("x-forwarded-proto");
pub const FORWARDED_FOR_HEADER: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Mutable per-request state threaded through the stages. The body is not
/// part of the context; it stays a stream until the forwarder sends it.
#[derive(Debug)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub client_addr: Option<SocketAddr>,
    pub route: Option<RouteRule>,
    pub claims: Option<Claims>,
}

impl RequestContext {
    pub fn from_parts(parts: Parts) -> Self {
        let client_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            client_addr,
            route: None,
            claims: None,
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Host the client addressed, from `Host` or the URI authority.
    fn inbound_host(&self) -> Option<HeaderValue> {
        self.headers.get(HOST).cloned().or_else(|| {
            self.uri
                .authority()
                .and_then(|authority| HeaderValue::from_str(authority.as_str()).ok())
        })
    }
}

/// One named stage with a pass/reject contract.
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;

    fn intercept(&self, ctx: &mut RequestContext) -> Result<(), GatewayError>;
}

/// Ordered list of stages.
pub struct Pipeline {
    stages: Vec<Box<dyn Interceptor>>,
}

impl Pipeline {
    pub fn new(stages: Vec<Box<dyn Interceptor>>) -> Self {
        Self { stages }
    }

    /// `resolve-route`, `authenticate`, `forward-headers`.
    pub fn standard(routes: Arc<RouteTable>, codec: Arc<TokenCodec>) -> Self {
        Self::new(vec![
            Box::new(ResolveRoute { routes }),
            Box::new(Authenticate { codec }),
            Box::new(ForwardHeaders),
        ])
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn run(&self, ctx: &mut RequestContext) -> Result<(), GatewayError> {
        for stage in &self.stages {
            if let Err(e) = stage.intercept(ctx) {
                debug!(stage = stage.name(), path = ctx.path(), error = %e, "Request rejected");
                return Err(e);
            }
        }
        Ok(())
    }
}

pub struct ResolveRoute {
    pub routes: Arc<RouteTable>,
}

impl Interceptor for ResolveRoute {
    fn name(&self) -> &'static str {
        "resolve-route"
    }

    fn intercept(&self, ctx: &mut RequestContext) -> Result<(), GatewayError> {
        let rule = self
            .routes
            .match_path(ctx.path())
            .ok_or(GatewayError::RouteNotFound)?;
        ctx.route = Some(rule.clone());
        Ok(())
    }
}

pub struct Authenticate {
    pub codec: Arc<TokenCodec>,
}

impl Interceptor for Authenticate {
    fn name(&self) -> &'static str {
        "authenticate"
    }

    fn intercept(&self, ctx: &mut RequestContext) -> Result<(), GatewayError> {
        // Identity only ever comes from a verified token.
        ctx.headers.remove(&USER_ID_HEADER);

        // Fail closed if routing did not run.
        let route = ctx.route.as_ref().ok_or(GatewayError::RouteNotFound)?;
        if !route.requires_auth() {
            return Ok(());
        }

        let claims = self.codec.verify(bearer_token(&ctx.headers)?).map_err(|e| {
            tracing::warn!(reason = e.reason(), path = ctx.path(), "Bearer token rejected");
            AuthError::from(e)
        })?;

        let user_id = HeaderValue::from_str(&claims.sub).map_err(|_| {
            tracing::warn!(reason = "malformed", path = ctx.path(), "Token subject is not a valid header value");
            AuthError::from(TokenError::Malformed)
        })?;
        ctx.headers.insert(USER_ID_HEADER.clone(), user_id);
        ctx.claims = Some(claims);
        Ok(())
    }
}

pub struct ForwardHeaders;

impl Interceptor for ForwardHeaders {
    fn name(&self) -> &'static str {
        "forward-headers"
    }

    fn intercept(&self, ctx: &mut RequestContext) -> Result<(), GatewayError> {
        let inbound_host = ctx.inbound_host();

        strip_hop_by_hop(&mut ctx.headers);
        // The client builds Host from the backend URL.
        ctx.headers.remove(HOST);

        if let Some(host) = inbound_host {
            ctx.headers.insert(FORWARDED_HOST_HEADER.clone(), host);
        }
        if !ctx.headers.contains_key(&FORWARDED_PROTO_HEADER) {
            let scheme = ctx.uri.scheme_str().unwrap_or("http");
            if let Ok(value) = HeaderValue::from_str(scheme) {
                ctx.headers.insert(FORWARDED_PROTO_HEADER.clone(), value);
            }
        }
        if let Some(addr) = ctx.client_addr {
            let chain = match ctx.headers.get(&FORWARDED_FOR_HEADER).and_then(|v| v.to_str().ok()) {
                Some(existing) => format!("{existing}, {}", addr.ip()),
                None => addr.ip().to_string(),
            };
            if let Ok(value) = HeaderValue::from_str(&chain) {
                ctx.headers.insert(FORWARDED_FOR_HEADER.clone(), value);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::codec::DEFAULT_TOKEN_TTL;
    use axum::http::{header::AUTHORIZATION, Request};

    fn routes() -> Arc<RouteTable> {
        Arc::new(
            RouteTable::new(vec![
                RouteRule::new("/auth", "http://auth:8081", false).unwrap(),
                RouteRule::new("/todo", "http://todo:8082", true).unwrap(),
            ])
            .unwrap(),
        )
    }

    fn codec() -> Arc<TokenCodec> {
        Arc::new(TokenCodec::new(b"interceptor-secret", DEFAULT_TOKEN_TTL).unwrap())
    }

    fn ctx(path: &str, headers: &[(&str, &str)]) -> RequestContext {
        let mut builder = Request::builder().uri(path);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        RequestContext::from_parts(builder.body(()).unwrap().into_parts().0)
    }

    #[test]
    fn standard_pipeline_order() {
        let pipeline = Pipeline::standard(routes(), codec());
        assert_eq!(
            pipeline.stage_names(),
            vec!["resolve-route", "authenticate", "forward-headers"]
        );
    }

    #[test]
    fn unknown_path_is_not_found() {
        let pipeline = Pipeline::standard(routes(), codec());
        let mut ctx = ctx("/nowhere", &[]);
        assert!(matches!(pipeline.run(&mut ctx), Err(GatewayError::RouteNotFound)));
    }

    #[test]
    fn public_route_passes_without_token() {
        let pipeline = Pipeline::standard(routes(), codec());
        let mut ctx = ctx("/auth/login", &[]);
        pipeline.run(&mut ctx).unwrap();
        assert!(ctx.claims.is_none());
        assert_eq!(ctx.route.unwrap().prefix(), "/auth");
    }

    #[test]
    fn protected_route_requires_bearer() {
        let pipeline = Pipeline::standard(routes(), codec());

        let mut missing = ctx("/todo/items", &[]);
        assert!(matches!(
            pipeline.run(&mut missing),
            Err(GatewayError::Unauthorized(AuthError::MissingAuthHeader))
        ));

        let mut basic = ctx("/todo/items", &[("authorization", "Basic dXNlcjpwYXNz")]);
        assert!(matches!(
            pipeline.run(&mut basic),
            Err(GatewayError::Unauthorized(AuthError::InvalidAuthHeader))
        ));

        let mut forged = ctx("/todo/items", &[("authorization", "Bearer a.b.c")]);
        assert!(matches!(
            pipeline.run(&mut forged),
            Err(GatewayError::Unauthorized(AuthError::Token(TokenError::Malformed)))
        ));
    }

    #[test]
    fn verified_claims_are_attached() {
        let codec = codec();
        let pipeline = Pipeline::standard(routes(), codec.clone());
        let token = codec.issue("user_42").unwrap().token;

        let mut ctx = ctx("/todo/items", &[("authorization", &format!("Bearer {token}"))]);
        pipeline.run(&mut ctx).unwrap();

        assert_eq!(ctx.claims.as_ref().unwrap().sub, "user_42");
        assert_eq!(ctx.headers.get(&USER_ID_HEADER).unwrap(), "user_42");
        assert!(ctx.headers.contains_key(AUTHORIZATION));
    }

    #[test]
    fn spoofed_user_id_is_removed() {
        let pipeline = Pipeline::standard(routes(), codec());
        let mut ctx = ctx("/auth/login", &[("x-user-id", "admin")]);
        pipeline.run(&mut ctx).unwrap();
        assert!(ctx.headers.get(&USER_ID_HEADER).is_none());
    }

    #[test]
    fn forward_headers_rewrites_metadata() {
        let pipeline = Pipeline::standard(routes(), codec());
        let mut ctx = ctx(
            "/auth/login",
            &[
                ("host", "gateway.example.com"),
                ("connection", "keep-alive, x-hop"),
                ("x-hop", "1"),
                ("keep-alive", "timeout=5"),
                ("content-type", "application/json"),
            ],
        );
        ctx.client_addr = Some("10.0.0.7:5555".parse().unwrap());
        pipeline.run(&mut ctx).unwrap();

        assert!(ctx.headers.get(HOST).is_none());
        assert!(ctx.headers.get("connection").is_none());
        assert!(ctx.headers.get("keep-alive").is_none());
        assert!(ctx.headers.get("x-hop").is_none());
        assert_eq!(ctx.headers.get(&FORWARDED_HOST_HEADER).unwrap(), "gateway.example.com");
        assert_eq!(ctx.headers.get(&FORWARDED_PROTO_HEADER).unwrap(), "http");
        assert_eq!(ctx.headers.get(&FORWARDED_FOR_HEADER).unwrap(), "10.0.0.7");
        assert_eq!(ctx.headers.get("content-type").unwrap(), "application/json");
    }

    #[test]
    fn dot_segments_cannot_escape_a_public_prefix() {
        let routes = Arc::new(
            RouteTable::new(vec![
                RouteRule::new("/todo", "http://todo:8082", true).unwrap(),
                RouteRule::new("/todo/public", "http://todo:8082", false).unwrap(),
            ])
            .unwrap(),
        );
        let pipeline = Pipeline::standard(routes, codec());

        for path in ["/todo/public/../items", "/todo/public/%2e%2e/items"] {
            let mut ctx = ctx(path, &[]);
            assert!(matches!(pipeline.run(&mut ctx), Err(GatewayError::RouteNotFound)), "{path}");
            assert!(ctx.route.is_none());
        }
    }

    #[test]
    fn subject_that_is_not_a_header_value_is_rejected() {
        let codec = codec();
        let pipeline = Pipeline::standard(routes(), codec.clone());
        let token = codec.issue("user\nX-Injected: 1").unwrap().token;

        let mut ctx = ctx("/todo/items", &[("authorization", &format!("Bearer {token}"))]);
        assert!(matches!(
            pipeline.run(&mut ctx),
            Err(GatewayError::Unauthorized(AuthError::Token(TokenError::Malformed)))
        ));
        assert!(ctx.headers.get(&USER_ID_HEADER).is_none());
    }

    #[test]
    fn authenticate_without_route_fails_closed() {
        let stage = Authenticate { codec: codec() };
        let mut ctx = ctx("/todo/items", &[]);
        assert!(matches!(stage.intercept(&mut ctx), Err(GatewayError::RouteNotFound)));
    }
}
