// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Password hashing and verification using Argon2id.
//!
//! Hashes are PHC strings, so the salt and work factor travel with each hash
//! and verification keeps working after the parameters are retuned.

use std::sync::OnceLock;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Default Argon2 memory cost in KiB (OWASP baseline for Argon2id).
pub const DEFAULT_MEMORY_KIB: u32 = 19 * 1024;

/// Default Argon2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 2;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("invalid password hash parameters: {0}")]
    Params(String),
    #[error("failed to hash password: {0}")]
    Hash(String),
    #[error("stored password hash is not a valid PHC string")]
    InvalidHash,
}

/// Argon2id hasher with a tunable work factor.
#[derive(Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("memory_kib", &self.params.m_cost())
            .field("iterations", &self.params.t_cost())
            .finish()
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl PasswordHasher {
    pub fn new(memory_kib: u32, iterations: u32) -> Result<Self, PasswordError> {
        let params = Params::new(memory_kib, iterations, Params::DEFAULT_P_COST, None)
            .map_err(|e| PasswordError::Params(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hash a password with a fresh random salt.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| PasswordError::Hash(e.to_string()))
    }

    /// Verify a password against a stored PHC hash in constant time.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;
        Ok(self.argon2().verify_password(password.as_bytes(), &parsed).is_ok())
    }

    /// Burn one verification's worth of work for an unknown account so that
    /// lookups of missing users cost about as much as wrong passwords.
    pub fn verify_dummy(&self, password: &str) {
        static DUMMY: OnceLock<Option<String>> = OnceLock::new();
        let dummy = DUMMY.get_or_init(|| self.hash("dummy-password-for-timing").ok());
        if let Some(hash) = dummy {
            let _ = self.verify(password, hash);
        }
    }
}
