// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Credential Storage
//!
//! Email and password-hash records consumed by the auth service.
//!
//! ## Backends
//!
//! - [`InMemoryCredentialStore`] - process-local map, for tests and single-node dev
//! - [`RedbCredentialStore`] - embedded ACID database on disk
//!
//! Both are synchronous; the auth service calls them from the blocking pool
//! under a timeout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

pub mod embedded;
pub mod memory;

pub use embedded::RedbCredentialStore;
pub use memory::InMemoryCredentialStore;

/// A registered credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Opaque identifier, used as the token subject
    pub id: Uuid,
    /// Normalized email (unique)
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"[redacted]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl Credential {
    pub fn new(email: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("a credential with this email already exists")]
    Duplicate,

    #[error("credential store failure: {0}")]
    Backend(String),
}

/// Persistence for credentials.
///
/// `email` arguments are expected to be normalized with [`normalize_email`].
pub trait CredentialStore: Send + Sync {
    /// Insert a new credential; fails with [`StoreError::Duplicate`] if the
    /// email is taken.
    fn create(&self, email: &str, password_hash: &str) -> Result<Credential, StoreError>;

    fn find_by_email(&self, email: &str) -> Result<Option<Credential>, StoreError>;
}

/// Case-normalize an email for storage and lookup.
///
/// Trims surrounding whitespace, applies Unicode NFKC and lowercases, so
/// visually identical addresses map to one record.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().nfkc().collect::<String>().to_lowercase()
}
