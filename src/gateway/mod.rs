// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Gateway
//!
//! Single entry point in front of the backend services.
//!
//! For every request except `GET /health`:
//!
//! 1. Run the interceptor [`Pipeline`](interceptors::Pipeline)
//!    (route resolution, bearer verification on protected routes, header
//!    rewrite)
//! 2. Stream the request to the matched backend with the
//!    [`Forwarder`](proxy::Forwarder)
//! 3. Stream the backend response back unchanged
//!
//! Every failure is terminal for its request; there are no retries.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::api::health;
use crate::auth::TokenCodec;
use crate::config::{ConfigError, GatewayConfig};
use crate::state::GatewayState;

pub mod error;
pub mod interceptors;
pub mod proxy;
pub mod routes;

pub use error::GatewayError;
pub use interceptors::{Interceptor, Pipeline, RequestContext};
pub use proxy::Forwarder;
pub use routes::{RouteRule, RouteTable};

/// Assemble gateway state from configuration and a shared codec.
pub fn build_state(config: &GatewayConfig, codec: Arc<TokenCodec>) -> Result<GatewayState, ConfigError> {
    let routes = Arc::new(RouteTable::new(config.routes.clone())?);
    let forwarder = Forwarder::new(config.connect_timeout, config.upstream_timeout).map_err(|e| {
        ConfigError::Invalid {
            name: "upstream client",
            reason: e.to_string(),
        }
    })?;

    for rule in routes.rules() {
        tracing::info!(
            prefix = rule.prefix(),
            target = %rule.target(),
            requires_auth = rule.requires_auth(),
            "Route registered"
        );
    }

    Ok(GatewayState::new(Pipeline::standard(routes, codec), forwarder))
}

pub fn router(state: GatewayState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health::liveness))
        .fallback(proxy_request)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
}

/// Fallback handler: every non-health request goes through the pipeline.
pub async fn proxy_request(State(state): State<GatewayState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let mut ctx = RequestContext::from_parts(parts);

    if let Err(e) = state.pipeline.run(&mut ctx) {
        return e.into_response();
    }

    match state.forwarder.forward(ctx, body).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
