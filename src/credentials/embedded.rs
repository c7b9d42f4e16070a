// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Embedded credential store backed by redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `credentials`: normalized email → serialized [`Credential`] (JSON bytes)

use std::fmt::Display;
use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};

use super::{Credential, CredentialStore, StoreError};

const CREDENTIALS: TableDefinition<&str, &[u8]> = TableDefinition::new("credentials");

fn backend(e: impl Display) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Credential store persisted in a single redb file.
///
/// Owns the database handle; the file lock is released when the store is
/// dropped.
pub struct RedbCredentialStore {
    db: Database,
}

impl RedbCredentialStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(backend)?;
        }
        let db = Database::create(path).map_err(backend)?;

        // Pre-create the table so read transactions on a fresh file don't fail
        let write_txn = db.begin_write().map_err(backend)?;
        {
            let _ = write_txn.open_table(CREDENTIALS).map_err(backend)?;
        }
        write_txn.commit().map_err(backend)?;

        Ok(Self { db })
    }
}

impl CredentialStore for RedbCredentialStore {
    fn create(&self, email: &str, password_hash: &str) -> Result<Credential, StoreError> {
        let credential = Credential::new(email, password_hash);
        let json = serde_json::to_vec(&credential).map_err(backend)?;

        // redb serializes writers, so check-then-insert is atomic.
        let write_txn = self.db.begin_write().map_err(backend)?;
        {
            let mut table = write_txn.open_table(CREDENTIALS).map_err(backend)?;
            if table.get(email).map_err(backend)?.is_some() {
                return Err(StoreError::Duplicate);
            }
            table.insert(email, json.as_slice()).map_err(backend)?;
        }
        write_txn.commit().map_err(backend)?;

        Ok(credential)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Credential>, StoreError> {
        let read_txn = self.db.begin_read().map_err(backend)?;
        let table = read_txn.open_table(CREDENTIALS).map_err(backend)?;
        match table.get(email).map_err(backend)? {
            Some(value) => {
                let credential: Credential = serde_json::from_slice(value.value()).map_err(backend)?;
                Ok(Some(credential))
            }
            None => Ok(None),
        }
    }
}
