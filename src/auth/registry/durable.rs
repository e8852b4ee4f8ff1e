// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Durable registry backend on redb (pure Rust, ACID).
//!
//! ## Table Layout
//!
//! - `renewal_credentials`: credential id → JSON-serialized [`RenewalRecord`]
//!
//! Each trait method runs in its own write (or read) transaction, so rotation
//! and family revocation are atomic across concurrent requests and crashes.

use std::path::Path;

use redb::{Database, ReadableDatabase, ReadableTable, Table, TableDefinition};

use super::{RegistryResult, RegistryStore, RenewalRecord, RenewalStatus, RotateOutcome};

/// credential id → serialized RenewalRecord (JSON bytes).
const RENEWAL_CREDENTIALS: TableDefinition<&str, &[u8]> =
    TableDefinition::new("renewal_credentials");

/// Registry that survives restarts.
pub struct RedbRegistry {
    db: Database,
}

impl RedbRegistry {
    /// Open (or create) the registry database at the given path.
    pub fn open(path: &Path) -> RegistryResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let db = Database::create(path)?;

        // Pre-create the table so later read transactions don't fail
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(RENEWAL_CREDENTIALS)?;
        }
        write_txn.commit()?;

        Ok(Self { db })
    }
}

/// Remove every entry matching `doomed`, returning how many went.
fn remove_where(
    table: &mut Table<'_, &'static str, &'static [u8]>,
    doomed: impl Fn(&RenewalRecord) -> bool,
) -> RegistryResult<usize> {
    let mut keys = Vec::new();
    for entry in table.iter()? {
        let (key, value) = entry?;
        let record: RenewalRecord = serde_json::from_slice(value.value())?;
        if doomed(&record) {
            keys.push(key.value().to_string());
        }
    }

    for key in &keys {
        table.remove(key.as_str())?;
    }
    Ok(keys.len())
}

fn read_record(
    table: &impl ReadableTable<&'static str, &'static [u8]>,
    id: &str,
) -> RegistryResult<Option<RenewalRecord>> {
    let record = match table.get(id)? {
        Some(value) => Some(serde_json::from_slice(value.value())?),
        None => None,
    };
    Ok(record)
}

impl RegistryStore for RedbRegistry {
    fn backend(&self) -> &'static str {
        "redb"
    }

    fn insert(&self, id: &str, record: &RenewalRecord) -> RegistryResult<()> {
        let json = serde_json::to_vec(record)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(RENEWAL_CREDENTIALS)?;
            table.insert(id, json.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get(&self, id: &str) -> RegistryResult<Option<RenewalRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RENEWAL_CREDENTIALS)?;
        read_record(&table, id)
    }

    fn remove(&self, id: &str) -> RegistryResult<Option<RenewalRecord>> {
        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(RENEWAL_CREDENTIALS)?;
            let removed = match table.remove(id)? {
                Some(value) => Some(serde_json::from_slice::<RenewalRecord>(value.value())?),
                None => None,
            };
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    fn rotate(
        &self,
        old_id: &str,
        new_id: &str,
        successor: &RenewalRecord,
    ) -> RegistryResult<RotateOutcome> {
        let write_txn = self.db.begin_write()?;
        let outcome = {
            let mut table = write_txn.open_table(RENEWAL_CREDENTIALS)?;
            match read_record(&table, old_id)? {
                None => RotateOutcome::Unknown,
                Some(current) if current.status == RenewalStatus::Rotated => {
                    let family_id = current.family_id;
                    let revoked = remove_where(&mut table, |record| record.family_id == family_id)?;
                    RotateOutcome::Reused { family_id, revoked }
                }
                Some(mut current) => {
                    current.status = RenewalStatus::Rotated;
                    let old_json = serde_json::to_vec(&current)?;
                    let new_json = serde_json::to_vec(successor)?;
                    table.insert(old_id, old_json.as_slice())?;
                    table.insert(new_id, new_json.as_slice())?;
                    RotateOutcome::Rotated
                }
            }
        };
        write_txn.commit()?;
        Ok(outcome)
    }

    fn revoke_family(&self, family_id: &str) -> RegistryResult<usize> {
        let write_txn = self.db.begin_write()?;
        let revoked = {
            let mut table = write_txn.open_table(RENEWAL_CREDENTIALS)?;
            remove_where(&mut table, |record| record.family_id == family_id)?
        };
        write_txn.commit()?;
        Ok(revoked)
    }

    fn purge_expired(&self, now: i64) -> RegistryResult<usize> {
        let write_txn = self.db.begin_write()?;
        let purged = {
            let mut table = write_txn.open_table(RENEWAL_CREDENTIALS)?;
            remove_where(&mut table, |record| record.expires_at <= now)?
        };
        write_txn.commit()?;
        Ok(purged)
    }

    fn len(&self) -> RegistryResult<usize> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(RENEWAL_CREDENTIALS)?;
        let mut count = 0;
        for entry in table.iter()? {
            entry?;
            count += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tempfile::TempDir;

    use super::super::{tests as shared, RenewalRegistry};
    use super::*;

    fn registry() -> (RenewalRegistry, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = RedbRegistry::open(&temp_dir.path().join("registry.redb")).unwrap();
        (RenewalRegistry::new(Arc::new(store)), temp_dir)
    }

    #[test]
    fn add_contains_remove() {
        let (registry, _temp_dir) = registry();
        shared::exercise_add_contains_remove(registry);
    }

    #[test]
    fn rotation_and_reuse() {
        let (registry, _temp_dir) = registry();
        shared::exercise_rotation_and_reuse(registry);
    }

    #[test]
    fn purge_expired() {
        let (registry, _temp_dir) = registry();
        shared::exercise_purge_expired(registry);
    }

    #[test]
    fn entries_survive_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested/registry.redb");

        {
            let store = RedbRegistry::open(&path).unwrap();
            let registry = RenewalRegistry::new(Arc::new(store));
            registry
                .add("r1", &RenewalRecord::active("alice", "fam-1", i64::MAX))
                .unwrap();
        }

        let store = RedbRegistry::open(&path).unwrap();
        let registry = RenewalRegistry::new(Arc::new(store));
        assert!(registry.contains("r1").unwrap());
        assert_eq!(registry.backend(), "redb");
    }
}
