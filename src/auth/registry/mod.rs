// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Refresh Credential Registry
//!
//! Server-side record of which refresh credentials are currently redeemable.
//! A refresh credential is only honoured if its signature verifies **and** it
//! is present here as [`RenewalStatus::Active`].
//!
//! ## Keys
//!
//! Entries are keyed by a credential id: the unpadded base64url SHA-256 digest
//! of the raw token. Raw tokens are never stored, so a leaked registry file
//! cannot be replayed.
//!
//! ## Rotation
//!
//! Redeeming a refresh credential replaces it with a successor in one step
//! ([`RegistryStore::rotate`]). The old entry is kept as `Rotated` until it
//! expires so that a second presentation can be recognised as reuse, which
//! revokes every credential of the same family.
//!
//! ## Backends
//!
//! - [`InMemoryRegistry`]: mutex around a `HashMap`; lost on restart
//! - [`RedbRegistry`]: redb file, survives restarts

use std::sync::Arc;

use base64ct::{Base64UrlUnpadded, Encoding};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

mod durable;
mod memory;

pub use durable::RedbRegistry;
pub use memory::InMemoryRegistry;

// =============================================================================
// Records
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenewalStatus {
    /// May be redeemed once.
    Active,
    /// Already redeemed; presenting it again signals theft.
    Rotated,
}

/// What the registry knows about one refresh credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenewalRecord {
    pub principal: String,
    pub family_id: String,
    /// UNIX seconds; the sweeper drops the entry at or after this instant.
    pub expires_at: i64,
    pub status: RenewalStatus,
}

impl RenewalRecord {
    pub fn active(principal: impl Into<String>, family_id: impl Into<String>, expires_at: i64) -> Self {
        Self {
            principal: principal.into(),
            family_id: family_id.into(),
            expires_at,
            status: RenewalStatus::Active,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == RenewalStatus::Active
    }
}

/// Result of an atomic rotation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotateOutcome {
    /// Old entry marked rotated, successor registered.
    Rotated,
    /// Old entry was already rotated; its whole family has been removed.
    Reused { family_id: String, revoked: usize },
    /// Old entry is not in the registry (never issued, logged out, or swept).
    Unknown,
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("registry lock poisoned")]
    Poisoned,

    #[error("redb error: {0}")]
    Redb(#[from] redb::Error),

    #[error("redb database error: {0}")]
    RedbDatabase(#[from] redb::DatabaseError),

    #[error("redb transaction error: {0}")]
    RedbTransaction(#[from] redb::TransactionError),

    #[error("redb table error: {0}")]
    RedbTable(#[from] redb::TableError),

    #[error("redb storage error: {0}")]
    RedbStorage(#[from] redb::StorageError),

    #[error("redb commit error: {0}")]
    RedbCommit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

// =============================================================================
// Store trait
// =============================================================================

/// Storage backend for the registry, keyed by credential id.
///
/// Every method is a single atomic step with respect to concurrent callers.
pub trait RegistryStore: Send + Sync {
    /// Short backend name for health reporting.
    fn backend(&self) -> &'static str;

    /// Insert or overwrite an entry.
    fn insert(&self, id: &str, record: &RenewalRecord) -> RegistryResult<()>;

    fn get(&self, id: &str) -> RegistryResult<Option<RenewalRecord>>;

    /// Remove an entry, returning it if it was present.
    fn remove(&self, id: &str) -> RegistryResult<Option<RenewalRecord>>;

    /// Mark `old_id` rotated and register `new_id` in one step.
    ///
    /// If `old_id` is already rotated, remove its whole family instead.
    fn rotate(&self, old_id: &str, new_id: &str, successor: &RenewalRecord)
        -> RegistryResult<RotateOutcome>;

    /// Remove every entry of `family_id`; returns how many were removed.
    fn revoke_family(&self, family_id: &str) -> RegistryResult<usize>;

    /// Remove every entry with `expires_at <= now`; returns how many were removed.
    fn purge_expired(&self, now: i64) -> RegistryResult<usize>;

    /// Number of entries, rotated ones included.
    fn len(&self) -> RegistryResult<usize>;
}

// =============================================================================
// Registry handle
// =============================================================================

/// Derive the registry key for a raw token.
pub fn credential_id(token: &str) -> String {
    let digest = Sha256::digest(token.trim().as_bytes());
    Base64UrlUnpadded::encode_string(&digest)
}

/// Token-level view over a [`RegistryStore`].
///
/// Cheap to clone; clones share the same store.
#[derive(Clone)]
pub struct RenewalRegistry {
    store: Arc<dyn RegistryStore>,
}

impl RenewalRegistry {
    pub fn new(store: Arc<dyn RegistryStore>) -> Self {
        Self { store }
    }

    /// Volatile registry; contents are lost when the process exits.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryRegistry::default()))
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    /// Register `token`. Adding the same token twice leaves one entry.
    pub fn add(&self, token: &str, record: &RenewalRecord) -> RegistryResult<()> {
        self.store.insert(&credential_id(token), record)
    }

    /// Forget `token`. Absent tokens are not an error.
    pub fn remove(&self, token: &str) -> RegistryResult<Option<RenewalRecord>> {
        self.store.remove(&credential_id(token))
    }

    /// Whether `token` is registered and still redeemable.
    pub fn contains(&self, token: &str) -> RegistryResult<bool> {
        Ok(self.lookup(token)?.is_some_and(|record| record.is_active()))
    }

    pub fn lookup(&self, token: &str) -> RegistryResult<Option<RenewalRecord>> {
        self.store.get(&credential_id(token))
    }

    pub fn rotate(
        &self,
        old_token: &str,
        new_token: &str,
        successor: &RenewalRecord,
    ) -> RegistryResult<RotateOutcome> {
        self.store
            .rotate(&credential_id(old_token), &credential_id(new_token), successor)
    }

    pub fn revoke_family(&self, family_id: &str) -> RegistryResult<usize> {
        self.store.revoke_family(family_id)
    }

    pub fn purge_expired(&self, now: i64) -> RegistryResult<usize> {
        self.store.purge_expired(now)
    }

    pub fn len(&self) -> RegistryResult<usize> {
        self.store.len()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Behaviour every backend must share; each backend's tests call these.
    pub(crate) fn exercise_add_contains_remove(registry: RenewalRegistry) {
        let record = RenewalRecord::active("alice", "fam-1", i64::MAX);

        assert!(!registry.contains("token-a").unwrap());
        registry.add("token-a", &record).unwrap();
        assert!(registry.contains("token-a").unwrap());

        // Idempotent add
        registry.add("token-a", &record).unwrap();
        assert_eq!(registry.len().unwrap(), 1);

        assert_eq!(registry.remove("token-a").unwrap(), Some(record));
        assert!(!registry.contains("token-a").unwrap());

        // Removing again is fine
        assert_eq!(registry.remove("token-a").unwrap(), None);
    }

    pub(crate) fn exercise_rotation_and_reuse(registry: RenewalRegistry) {
        let first = RenewalRecord::active("alice", "fam-1", i64::MAX);
        let second = RenewalRecord::active("alice", "fam-1", i64::MAX);
        let third = RenewalRecord::active("alice", "fam-1", i64::MAX);
        let other_family = RenewalRecord::active("bob", "fam-2", i64::MAX);

        registry.add("r1", &first).unwrap();
        registry.add("bob-token", &other_family).unwrap();

        assert_eq!(
            registry.rotate("r1", "r2", &second).unwrap(),
            RotateOutcome::Rotated
        );
        assert!(!registry.contains("r1").unwrap());
        assert!(registry.contains("r2").unwrap());
        assert_eq!(
            registry.lookup("r1").unwrap().map(|r| r.status),
            Some(RenewalStatus::Rotated)
        );

        // Presenting r1 again: reuse, whole family goes.
        assert_eq!(
            registry.rotate("r1", "r3", &third).unwrap(),
            RotateOutcome::Reused {
                family_id: "fam-1".to_string(),
                revoked: 2,
            }
        );
        assert!(!registry.contains("r2").unwrap());
        assert!(!registry.contains("r3").unwrap());
        assert!(registry.lookup("r1").unwrap().is_none());

        // Other families are untouched.
        assert!(registry.contains("bob-token").unwrap());

        assert_eq!(
            registry.rotate("never-issued", "r4", &third).unwrap(),
            RotateOutcome::Unknown
        );
        assert!(!registry.contains("r4").unwrap());
    }

    pub(crate) fn exercise_purge_expired(registry: RenewalRegistry) {
        registry
            .add("old", &RenewalRecord::active("alice", "fam-1", 100))
            .unwrap();
        registry
            .add("fresh", &RenewalRecord::active("alice", "fam-2", 300))
            .unwrap();

        assert_eq!(registry.purge_expired(99).unwrap(), 0);
        assert_eq!(registry.purge_expired(100).unwrap(), 1);
        assert!(!registry.contains("old").unwrap());
        assert!(registry.contains("fresh").unwrap());
    }

    #[test]
    fn credential_id_is_stable_and_not_the_token() {
        let id = credential_id("some.jwt.token");
        assert_eq!(id, credential_id("some.jwt.token"));
        assert_ne!(id, credential_id("some.jwt.tokem"));
        assert!(!id.contains("some"));
        // 32-byte digest, unpadded base64
        assert_eq!(id.len(), 43);
    }
}
