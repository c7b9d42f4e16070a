// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Registration and login.
//!
//! Store access and Argon2 work both run on the blocking pool. Store calls
//! carry a bounded timeout so a stuck backend surfaces as an error instead of
//! a hung request.

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tracing::{info, warn};

use super::codec::{IssuedToken, TokenCodec};
use super::password::PasswordHasher;
use super::{Claims, TokenError};
use crate::credentials::{normalize_email, Credential, CredentialStore, StoreError};

/// Minimum accepted password length.
pub const MIN_PASSWORD_LEN: usize = 8;

/// Default timeout for a single credential store call.
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("{0}")]
    InvalidInput(&'static str),

    #[error("email already registered")]
    DuplicateCredential,

    /// Same shape for unknown email and wrong password
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("credential store unavailable")]
    StoreUnavailable,

    #[error("internal error")]
    Internal,
}

impl AuthServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AuthServiceError::DuplicateCredential => StatusCode::CONFLICT,
            AuthServiceError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AuthServiceError::StoreUnavailable | AuthServiceError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

/// Validates credentials against the store and issues session tokens.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    codec: Arc<TokenCodec>,
    hasher: PasswordHasher,
    store_timeout: Duration,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, codec: Arc<TokenCodec>, hasher: PasswordHasher) -> Self {
        Self {
            store,
            codec,
            hasher,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    pub fn codec(&self) -> &Arc<TokenCodec> {
        &self.codec
    }

    /// Register a new credential.
    pub async fn register(&self, email: &str, password: &str) -> Result<Credential, AuthServiceError> {
        let email = normalize_email(email);
        validate_registration(&email, password)?;

        // Skip the expensive hash for emails that are already taken.
        let existing = {
            let store = self.store.clone();
            let email = email.clone();
            self.with_store(move || store.find_by_email(&email)).await?
        };
        if existing.is_some() {
            return Err(AuthServiceError::DuplicateCredential);
        }

        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|_| AuthServiceError::Internal)?
            .map_err(|e| {
                warn!(error = %e, "Password hashing failed");
                AuthServiceError::Internal
            })?;

        let store = self.store.clone();
        let credential = self.with_store(move || store.create(&email, &hash)).await?;

        info!(user_id = %credential.id, "Registered credential");
        Ok(credential)
    }

    /// Check credentials and issue a session token.
    pub async fn login(&self, email: &str, password: &str) -> Result<IssuedToken, AuthServiceError> {
        let email = normalize_email(email);

        let credential = {
            let store = self.store.clone();
            self.with_store(move || store.find_by_email(&email)).await?
        };

        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let subject = tokio::task::spawn_blocking(move || match credential {
            Some(credential) => match hasher.verify(&password, &credential.password_hash) {
                Ok(true) => Some(credential.id),
                Ok(false) => None,
                Err(e) => {
                    warn!(user_id = %credential.id, error = %e, "Stored password hash unreadable");
                    None
                }
            },
            None => {
                hasher.verify_dummy(&password);
                None
            }
        })
        .await
        .map_err(|_| AuthServiceError::Internal)?;

        let Some(subject) = subject else {
            return Err(AuthServiceError::InvalidCredentials);
        };

        let issued = self.codec.issue(&subject.to_string()).map_err(|e| {
            warn!(error = %e, "Token issuance failed");
            AuthServiceError::Internal
        })?;

        info!(user_id = %subject, expires_at = issued.claims.exp, "Issued session token");
        Ok(issued)
    }

    /// Introspect a bearer token.
    pub fn validate(&self, token: &str) -> Result<Claims, TokenError> {
        self.codec.verify(token)
    }

    /// Round-trip the credential store; used by readiness probes.
    pub async fn check_store(&self) -> bool {
        let store = self.store.clone();
        self.with_store(move || store.find_by_email("readiness-probe@invalid"))
            .await
            .is_ok()
    }

    async fn with_store<T, F>(&self, call: F) -> Result<T, AuthServiceError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    {
        match tokio::time::timeout(self.store_timeout, tokio::task::spawn_blocking(call)).await {
            Err(_) => {
                warn!(timeout_ms = self.store_timeout.as_millis() as u64, "Credential store call timed out");
                Err(AuthServiceError::StoreUnavailable)
            }
            Ok(Err(_)) => Err(AuthServiceError::Internal),
            Ok(Ok(Err(StoreError::Duplicate))) => Err(AuthServiceError::DuplicateCredential),
            Ok(Ok(Err(e))) => {
                warn!(error = %e, "Credential store call failed");
                Err(AuthServiceError::StoreUnavailable)
            }
            Ok(Ok(Ok(value))) => Ok(value),
        }
    }
}

fn validate_registration(email: &str, password: &str) -> Result<(), AuthServiceError> {
    let looks_like_email = email
        .split_once('@')
        .map(|(local, domain)| !local.is_empty() && !domain.is_empty() && !domain.contains('@'))
        .unwrap_or(false);
    if !looks_like_email {
        return Err(AuthServiceError::InvalidInput("a valid email is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthServiceError::InvalidInput("password must be at least 8 characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::codec::{ManualClock, DEFAULT_TOKEN_TTL};
    use crate::credentials::InMemoryCredentialStore;

    const NOW: i64 = 1_700_000_000;

    fn service() -> (AuthService, Arc<InMemoryCredentialStore>) {
        let store = Arc::new(InMemoryCredentialStore::new());
        let codec = TokenCodec::with_clock(
            b"service-test-secret",
            DEFAULT_TOKEN_TTL,
            Arc::new(ManualClock::new(NOW)),
        )
        .unwrap();
        let hasher = PasswordHasher::new(1024, 1).unwrap();
        (AuthService::new(store.clone(), Arc::new(codec), hasher), store)
    }

    #[tokio::test]
    async fn register_normalizes_and_hashes() {
        let (service, store) = service();
        let credential = service.register("  U@X.com ", "longpassword").await.unwrap();

        assert_eq!(credential.email, "u@x.com");
        assert_ne!(credential.password_hash, "longpassword");
        assert!(store.find_by_email("u@x.com").unwrap().is_some());
    }

    #[tokio::test]
    async fn register_rejects_duplicates_case_insensitively() {
        let (service, _store) = service();
        service.register("u@x.com", "longpassword").await.unwrap();

        let err = service.register("U@X.COM", "anotherpassword").await.unwrap_err();
        assert!(matches!(err, AuthServiceError::DuplicateCredential));
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn register_validates_input() {
        let (service, store) = service();

        let short = service.register("u@x.com", "short").await.unwrap_err();
        assert!(matches!(short, AuthServiceError::InvalidInput(_)));

        let no_at = service.register("not-an-email", "longpassword").await.unwrap_err();
        assert!(matches!(no_at, AuthServiceError::InvalidInput(_)));

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn login_issues_token_with_credential_subject() {
        let (service, _store) = service();
        let credential = service.register("u@x.com", "longpassword").await.unwrap();

        let issued = service.login("U@x.com", "longpassword").await.unwrap();
        assert_eq!(issued.claims.sub, credential.id.to_string());
        assert_eq!(service.validate(&issued.token).unwrap(), issued.claims);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_identical() {
        let (service, _store) = service();
        service.register("a@x.com", "longpassword").await.unwrap();

        let wrong = service.login("a@x.com", "wrong").await.unwrap_err();
        let missing = service.login("nouser@x.com", "anything").await.unwrap_err();

        assert!(matches!(wrong, AuthServiceError::InvalidCredentials));
        assert!(matches!(missing, AuthServiceError::InvalidCredentials));
        assert_eq!(wrong.to_string(), missing.to_string());
        assert_eq!(wrong.status_code(), missing.status_code());
    }

    struct StuckStore;

    impl CredentialStore for StuckStore {
        fn create(&self, _email: &str, _hash: &str) -> Result<Credential, StoreError> {
            std::thread::sleep(Duration::from_millis(500));
            Err(StoreError::Backend("unreachable".into()))
        }

        fn find_by_email(&self, _email: &str) -> Result<Option<Credential>, StoreError> {
            std::thread::sleep(Duration::from_millis(500));
            Ok(None)
        }
    }

    #[tokio::test]
    async fn store_timeout_is_reported_as_unavailable() {
        let codec = Arc::new(TokenCodec::new(b"secret", DEFAULT_TOKEN_TTL).unwrap());
        let service = AuthService::new(Arc::new(StuckStore), codec, PasswordHasher::new(1024, 1).unwrap())
            .with_store_timeout(Duration::from_millis(20));

        let err = service.login("a@x.com", "longpassword").await.unwrap_err();
        assert!(matches!(err, AuthServiceError::StoreUnavailable));
        assert!(!service.check_store().await);
    }
}
