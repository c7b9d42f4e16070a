// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory credential store.

use std::collections::HashMap;
use std::sync::RwLock;

use super::{Credential, CredentialStore, StoreError};

#[derive(Default)]
pub struct InMemoryCredentialStore {
    by_email: RwLock<HashMap<String, Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_email.read().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn create(&self, email: &str, password_hash: &str) -> Result<Credential, StoreError> {
        let mut map = self
            .by_email
            .write()
            .map_err(|_| StoreError::Backend("credential map lock poisoned".to_string()))?;

        if map.contains_key(email) {
            return Err(StoreError::Duplicate);
        }

        let credential = Credential::new(email, password_hash);
        map.insert(email.to_string(), credential.clone());
        Ok(credential)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Credential>, StoreError> {
        let map = self
            .by_email
            .read()
            .map_err(|_| StoreError::Backend("credential map lock poisoned".to_string()))?;
        Ok(map.get(email).cloned())
    }
}
