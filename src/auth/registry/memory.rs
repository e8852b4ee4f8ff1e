// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Volatile registry backend.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::{RegistryError, RegistryResult, RegistryStore, RenewalRecord, RenewalStatus, RotateOutcome};

/// Process-lifetime registry. A single mutex serializes every operation.
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    entries: Mutex<HashMap<String, RenewalRecord>>,
}

impl InMemoryRegistry {
    fn entries(&self) -> RegistryResult<MutexGuard<'_, HashMap<String, RenewalRecord>>> {
        self.entries.lock().map_err(|_| RegistryError::Poisoned)
    }
}

fn remove_where(
    entries: &mut HashMap<String, RenewalRecord>,
    doomed: impl Fn(&RenewalRecord) -> bool,
) -> usize {
    let before = entries.len();
    entries.retain(|_, record| !doomed(record));
    before - entries.len()
}

impl RegistryStore for InMemoryRegistry {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn insert(&self, id: &str, record: &RenewalRecord) -> RegistryResult<()> {
        self.entries()?.insert(id.to_string(), record.clone());
        Ok(())
    }

    fn get(&self, id: &str) -> RegistryResult<Option<RenewalRecord>> {
        Ok(self.entries()?.get(id).cloned())
    }

    fn remove(&self, id: &str) -> RegistryResult<Option<RenewalRecord>> {
        Ok(self.entries()?.remove(id))
    }

    fn rotate(
        &self,
        old_id: &str,
        new_id: &str,
        successor: &RenewalRecord,
    ) -> RegistryResult<RotateOutcome> {
        let mut entries = self.entries()?;

        let Some(current) = entries.get_mut(old_id) else {
            return Ok(RotateOutcome::Unknown);
        };

        match current.status {
            RenewalStatus::Active => {
                current.status = RenewalStatus::Rotated;
                entries.insert(new_id.to_string(), successor.clone());
                Ok(RotateOutcome::Rotated)
            }
            RenewalStatus::Rotated => {
                let family_id = current.family_id.clone();
                let revoked = remove_where(&mut entries, |record| record.family_id == family_id);
                Ok(RotateOutcome::Reused { family_id, revoked })
            }
        }
    }

    fn revoke_family(&self, family_id: &str) -> RegistryResult<usize> {
        let mut entries = self.entries()?;
        Ok(remove_where(&mut entries, |record| record.family_id == family_id))
    }

    fn purge_expired(&self, now: i64) -> RegistryResult<usize> {
        let mut entries = self.entries()?;
        Ok(remove_where(&mut entries, |record| record.expires_at <= now))
    }

    fn len(&self) -> RegistryResult<usize> {
        Ok(self.entries()?.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::super::{tests as shared, RenewalRegistry};
    use super::*;

    fn registry() -> RenewalRegistry {
        RenewalRegistry::new(Arc::new(InMemoryRegistry::default()))
    }

    #[test]
    fn add_contains_remove() {
        shared::exercise_add_contains_remove(registry());
    }

    #[test]
    fn rotation_and_reuse() {
        shared::exercise_rotation_and_reuse(registry());
    }

    #[test]
    fn purge_expired() {
        shared::exercise_purge_expired(registry());
    }

    #[test]
    fn concurrent_adds_are_not_lost() {
        let registry = registry();
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let registry = registry.clone();
                thread::spawn(move || {
                    for i in 0..100 {
                        let record = RenewalRecord::active("alice", format!("fam-{worker}"), i64::MAX);
                        registry.add(&format!("token-{worker}-{i}"), &record).unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len().unwrap(), 800);
        assert_eq!(registry.revoke_family("fam-3").unwrap(), 100);
        assert_eq!(registry.len().unwrap(), 700);
    }

    #[test]
    fn only_one_concurrent_rotation_wins() {
        let registry = registry();
        registry
            .add("r1", &RenewalRecord::active("alice", "fam-1", i64::MAX))
            .unwrap();

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let registry = registry.clone();
                thread::spawn(move || {
                    let successor = RenewalRecord::active("alice", "fam-1", i64::MAX);
                    registry.rotate("r1", &format!("r2-{i}"), &successor).unwrap()
                })
            })
            .collect();
        let outcomes: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();

        let winners = outcomes
            .iter()
            .filter(|outcome| **outcome == RotateOutcome::Rotated)
            .count();
        assert_eq!(winners, 1);
    }
}
