// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Authentication errors.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Outcome of a failed token operation.
///
/// The variants stay distinct for callers and logs; clients only ever see a
/// single generic rejection (see [`AuthError`]).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// Token cannot be parsed or its claims are not the expected shape
    #[error("token is malformed")]
    Malformed,

    /// Wrong secret, tampered payload or a non-allowed algorithm tag
    #[error("token signature is invalid")]
    SignatureInvalid,

    /// Clock check failed (`now >= exp`)
    #[error("token has expired")]
    Expired,

    /// Signing key or claims unusable; fatal at startup
    #[error("token signing failed: {0}")]
    Signing(String),
}

impl TokenError {
    pub fn reason(&self) -> &'static str {
        match self {
            TokenError::Malformed => "malformed_token",
            TokenError::SignatureInvalid => "invalid_signature",
            TokenError::Expired => "token_expired",
            TokenError::Signing(_) => "signing_error",
        }
    }
}

/// Bearer authentication error type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// No authorization header present
    #[error("authorization header is required")]
    MissingAuthHeader,
    /// Header present but not `Bearer <token>`
    #[error("invalid authorization header format")]
    InvalidAuthHeader,
    /// Token failed verification
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Message returned to clients for every bearer rejection.
pub const GENERIC_UNAUTHORIZED: &str = "invalid token";

#[derive(Serialize)]
struct AuthErrorBody {
    error: &'static str,
}

impl AuthError {
    /// Stable reason code for logs. Never sent to the client.
    pub fn error_code(&self) -> &'static str {
        match self {
            AuthError::MissingAuthHeader => "missing_auth_header",
            AuthError::InvalidAuthHeader => "invalid_auth_header",
            AuthError::Token(e) => e.reason(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::Token(TokenError::Signing(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::UNAUTHORIZED {
            tracing::debug!(reason = self.error_code(), "Rejected bearer credentials");
            (status, Json(AuthErrorBody { error: GENERIC_UNAUTHORIZED })).into_response()
        } else {
            tracing::error!(reason = self.error_code(), "Token processing failed");
            (status, Json(AuthErrorBody { error: "internal error" })).into_response()
        }
    }
}
