// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Gateway failure outcomes.
//!
//! Each variant is terminal for its request and maps to one stable status.
//! Messages are generic: backend addresses and error details stay in logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::auth::AuthError;
use crate::error::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("route not found")]
    RouteNotFound,

    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error("upstream unavailable")]
    UpstreamUnavailable,

    #[error("upstream timed out")]
    UpstreamTimeout,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::RouteNotFound => StatusCode::NOT_FOUND,
            GatewayError::Unauthorized(e) => e.status_code(),
            GatewayError::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
            GatewayError::UpstreamTimeout => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        match self {
            GatewayError::Unauthorized(e) => e.into_response(),
            GatewayError::RouteNotFound => ApiError::not_found("not found").into_response(),
            GatewayError::UpstreamUnavailable | GatewayError::UpstreamTimeout => {
                ApiError::new(self.status_code(), "proxy error").into_response()
            }
        }
    }
}
