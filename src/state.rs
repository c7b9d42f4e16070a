// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use axum::extract::FromRef;

use crate::auth::{AuthService, TokenCodec};
use crate::gateway::interceptors::Pipeline;
use crate::gateway::proxy::Forwarder;

/// Shared state of the auth service router.
#[derive(Clone)]
pub struct AuthState {
    pub auth: Arc<AuthService>,
}

impl AuthState {
    pub fn new(auth: AuthService) -> Self {
        Self {
            auth: Arc::new(auth),
        }
    }
}

impl FromRef<AuthState> for Arc<TokenCodec> {
    fn from_ref(state: &AuthState) -> Self {
        state.auth.codec().clone()
    }
}

/// Shared state of the gateway router. Immutable after startup.
#[derive(Clone)]
pub struct GatewayState {
    pub pipeline: Arc<Pipeline>,
    pub forwarder: Arc<Forwarder>,
}

impl GatewayState {
    pub fn new(pipeline: Pipeline, forwarder: Forwarder) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            forwarder: Arc::new(forwarder),
        }
    }
}
