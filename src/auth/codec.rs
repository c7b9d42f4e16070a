// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 session token issuance and verification.
//!
//! ## Verification order
//!
//! 1. Header must decode and name `HS256`; any other algorithm tag (including
//!    `none` and the other HMAC widths) fails closed.
//! 2. Signature is recomputed with the shared secret.
//! 3. Claims must decode into [`Claims`] with `exp > iat`.
//! 4. `now < exp` against the codec's clock.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use super::{Claims, TokenError};

/// The only signing algorithm accepted.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::HS256;

/// Default session lifetime (24 hours).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Source of the current time in epoch seconds.
pub trait Clock: Send + Sync {
    fn now(&self) -> i64;
}

/// Wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// Manually driven clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    /// Move the clock forward, saturating at `i64::MAX`.
    pub fn advance(&self, by: Duration) {
        let by = i64::try_from(by.as_secs()).unwrap_or(i64::MAX);
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |now| Some(now.saturating_add(by)));
    }

    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

/// Issues and verifies session tokens with a shared secret.
///
/// Constructed once at startup and shared read-only.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    ttl_secs: i64,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenCodec")
            .field("algorithm", &TOKEN_ALGORITHM)
            .field("ttl", &self.ttl)
            .field("secret", &"[redacted]")
            .finish()
    }
}

impl TokenCodec {
    /// Create a codec using the wall clock.
    ///
    /// An empty secret, a zero TTL or one beyond `i64` seconds is a
    /// misconfiguration and fails with
    /// [`TokenError::Signing`].
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, TokenError> {
        Self::with_clock(secret, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(secret: &[u8], ttl: Duration, clock: Arc<dyn Clock>) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::Signing("signing secret is empty".to_string()));
        }
        if ttl.as_secs() == 0 {
            return Err(TokenError::Signing("token TTL must be at least one second".to_string()));
        }
        let ttl_secs = i64::try_from(ttl.as_secs())
            .map_err(|_| TokenError::Signing("token TTL is out of range".to_string()))?;

        // Expiry is checked against our own clock after decoding.
        let mut validation = Validation::new(TOKEN_ALGORITHM);
        validation.algorithms = vec![TOKEN_ALGORITHM];
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
            ttl_secs,
            clock,
        })
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn now(&self) -> i64 {
        self.clock.now()
    }

    /// Issue a token for `subject` valid from now for the configured TTL.
    pub fn issue(&self, subject: &str) -> Result<IssuedToken, TokenError> {
        let claims = Claims::new(subject, self.clock.now(), self.ttl_secs);
        let token = self.encode(&claims)?;
        Ok(IssuedToken { token, claims })
    }

    /// Sign explicit claims.
    pub fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        if !claims.is_well_formed() {
            return Err(TokenError::Signing(
                "claims must have a subject and exp after iat".to_string(),
            ));
        }
        encode(&Header::new(TOKEN_ALGORITHM), claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify `token` and return its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let header = decode_header(token).map_err(|_| TokenError::Malformed)?;
        if header.alg != TOKEN_ALGORITHM {
            return Err(TokenError::SignatureInvalid);
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::InvalidSignature
                | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => TokenError::SignatureInvalid,
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        let claims = data.claims;
        if !claims.is_well_formed() {
            return Err(TokenError::Malformed);
        }
        if claims.is_expired_at(self.clock.now()) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
