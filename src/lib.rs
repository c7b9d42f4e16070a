// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gatekeeper - token-gated API gateway and session token issuer
//!
//! Two cooperating services sharing one HS256 signing secret:
//!
//! - the auth service registers credentials and issues session tokens
//! - the gateway verifies bearer tokens on protected routes and streams
//!   traffic to the backend that owns the path
//!
//! ## Modules
//!
//! - `api` - Auth service HTTP handlers (Axum)
//! - `auth` - Token codec, password hashing, auth service, bearer extraction
//! - `credentials` - Credential stores (in-memory, redb)
//! - `gateway` - Route table, interceptor pipeline, streaming forwarder
//! - `events` - Notification event envelope
//! - `config`, `server`, `telemetry` - Startup plumbing

pub mod api;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod events;
pub mod gateway;
pub mod server;
pub mod state;
pub mod telemetry;

use std::sync::Arc;

use auth::TokenCodec;
use config::{ConfigError, TokenSettings, JWT_SECRET_ENV};

/// Build the shared codec from token settings.
pub fn token_codec(settings: &TokenSettings) -> Result<Arc<TokenCodec>, ConfigError> {
    TokenCodec::new(settings.secret.as_bytes(), settings.ttl)
        .map(Arc::new)
        .map_err(|e| ConfigError::Invalid {
            name: JWT_SECRET_ENV,
            reason: e.to_string(),
        })
}
