// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bearer token extraction.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};

use super::{codec::TokenCodec, AuthError, AuthenticatedUser};

/// Pull the token out of an exact `Authorization: Bearer <token>` header.
///
/// The scheme is case-sensitive, separated by a single space, and the token
/// itself must be non-empty without embedded whitespace.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingAuthHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidAuthHeader)?;

    let token = value
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthHeader)?;

    if token.is_empty() || token.chars().any(char::is_whitespace) {
        return Err(AuthError::InvalidAuthHeader);
    }
    Ok(token)
}

/// Extractor for authenticated users.
///
/// Validates the bearer token with the state's [`TokenCodec`].
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
    Arc<TokenCodec>: FromRef<S>,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let codec = Arc::<TokenCodec>::from_ref(state);
        let claims = codec.verify(token)?;

        Ok(Auth(claims.into()))
    }
}
