// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Session token claims and authenticated user representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims carried inside a session token.
///
/// The set of fields is closed: a token whose payload carries any claim not
/// listed here fails to decode, so attacker-supplied extras are never
/// silently accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Claims {
    /// Subject (credential ID)
    pub sub: String,

    /// Issued at (epoch seconds)
    pub iat: i64,

    /// Expiration (epoch seconds)
    pub exp: i64,
}

impl Claims {
    /// Build claims for `subject` issued at `issued_at` and valid for `ttl_secs`.
    pub fn new(subject: impl Into<String>, issued_at: i64, ttl_secs: i64) -> Self {
        Self {
            sub: subject.into(),
            iat: issued_at,
            exp: issued_at.saturating_add(ttl_secs),
        }
    }

    /// `exp` must lie strictly after `iat`.
    pub fn is_well_formed(&self) -> bool {
        self.exp > self.iat && !self.sub.is_empty()
    }

    /// A token is valid only while `now < exp`.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Authenticated user information extracted from a verified token.
///
/// This is the type handed to request handlers once the bearer token has
/// been checked.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Credential ID (`sub` claim)
    pub user_id: String,

    /// Token expiration (Unix timestamp)
    pub expires_at: i64,
}

impl AuthenticatedUser {
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            expires_at: claims.exp,
        }
    }
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self::from_claims(claims)
    }
}
