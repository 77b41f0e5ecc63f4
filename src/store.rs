//! Record store boundary.
//!
//! The review workflow only ever needs two things from storage: read a whole
//! pool, and patch a single participant inside a pool. `RecordStore` captures
//! exactly that; `db::PgRecordStore` talks to Postgres and
//! `InMemoryRecordStore` keeps rows in a map.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::models::{ParticipantId, ParticipantPatch, ParticipantRecord};
use crate::pool::Pool;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Every row of the pool's table, unfiltered.
    async fn list(&self, pool: Pool) -> Result<Vec<ParticipantRecord>, StoreError>;

    /// Apply `patch` to the single row `id` in the pool's table. Last write wins.
    async fn update(
        &self,
        pool: Pool,
        id: &ParticipantId,
        patch: &ParticipantPatch,
    ) -> Result<(), StoreError>;
}

/// Map-backed store. Rows keep insertion order within a pool.
///
/// Reads and writes can be made to fail, and every update is counted, so
/// workflow behavior around store failures can be exercised without a database.
#[derive(Default)]
pub struct InMemoryRecordStore {
    pools: RwLock<HashMap<Pool, Vec<ParticipantRecord>>>,
    fail_lists: AtomicBool,
    fail_updates: AtomicBool,
    updates: AtomicUsize,
    patches: RwLock<Vec<(Pool, ParticipantId, ParticipantPatch)>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, pool: Pool, record: ParticipantRecord) {
        let mut pools = self.pools.write().await;
        let rows = pools.entry(pool).or_default();
        rows.retain(|row| row.id != record.id);
        rows.push(record);
    }

    pub async fn get(&self, pool: Pool, id: &ParticipantId) -> Option<ParticipantRecord> {
        let pools = self.pools.read().await;
        pools
            .get(&pool)
            .and_then(|rows| rows.iter().find(|row| &row.id == id).cloned())
    }

    pub fn fail_lists(&self, fail: bool) {
        self.fail_lists.store(fail, Ordering::SeqCst);
    }

    pub fn fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Number of update calls received, including failed ones.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }

    /// Patches that were successfully applied, oldest first.
    pub async fn applied_patches(&self) -> Vec<(Pool, ParticipantId, ParticipantPatch)> {
        self.patches.read().await.clone()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn list(&self, pool: Pool) -> Result<Vec<ParticipantRecord>, StoreError> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "list of {} refused",
                pool.table()
            )));
        }
        let pools = self.pools.read().await;
        Ok(pools.get(&pool).cloned().unwrap_or_default())
    }

    async fn update(
        &self,
        pool: Pool,
        id: &ParticipantId,
        patch: &ParticipantPatch,
    ) -> Result<(), StoreError> {
        self.updates.fetch_add(1, Ordering::SeqCst);
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "update of {} refused",
                pool.table()
            )));
        }

        let mut pools = self.pools.write().await;
        let row = pools
            .get_mut(&pool)
            .and_then(|rows| rows.iter_mut().find(|row| &row.id == id))
            .ok_or_else(|| StoreError::NotFound {
                table: pool.table(),
                id: id.clone(),
            })?;

        let conflict = match patch {
            ParticipantPatch::Approve => row.rejected,
            ParticipantPatch::Reject => row.approved,
            ParticipantPatch::TimeIn(_) | ParticipantPatch::TimeOut(_) => false,
        };
        if conflict {
            return Err(StoreError::ReviewStateConflict {
                table: pool.table(),
                id: id.clone(),
            });
        }

        match patch {
            ParticipantPatch::Approve => row.approved = true,
            ParticipantPatch::Reject => row.rejected = true,
            ParticipantPatch::TimeIn(stamp) => row.time_in = Some(stamp.clone()),
            ParticipantPatch::TimeOut(stamp) => row.time_out = Some(stamp.clone()),
        }
        drop(pools);

        self.patches
            .write()
            .await
            .push((pool, id.clone(), patch.clone()));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> ParticipantRecord {
        ParticipantRecord {
            id: ParticipantId::from(id),
            first_name: "JOMAR".to_string(),
            last_name: "BAUTISTA".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn update_is_scoped_to_pool() {
        let store = InMemoryRecordStore::new();
        store.insert(Pool::Onsite17, record("42")).await;
        store.insert(Pool::Onsite24, record("42")).await;

        store
            .update(Pool::Onsite17, &ParticipantId::from("42"), &ParticipantPatch::Reject)
            .await
            .unwrap();

        let onsite_17 = store.get(Pool::Onsite17, &ParticipantId::from("42")).await.unwrap();
        let onsite_24 = store.get(Pool::Onsite24, &ParticipantId::from("42")).await.unwrap();
        assert!(onsite_17.rejected);
        assert!(!onsite_24.rejected);
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let store = InMemoryRecordStore::new();
        let err = store
            .update(Pool::Online17, &ParticipantId::from("7"), &ParticipantPatch::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
        assert_eq!(store.update_count(), 1);
        assert!(store.applied_patches().await.is_empty());
    }

    #[tokio::test]
    async fn refuses_to_mark_row_both_approved_and_rejected() {
        let store = InMemoryRecordStore::new();
        let mut approved = record("42");
        approved.approved = true;
        let mut rejected = record("43");
        rejected.rejected = true;
        store.insert(Pool::Onsite17, approved).await;
        store.insert(Pool::Onsite17, rejected).await;

        let err = store
            .update(Pool::Onsite17, &ParticipantId::from("42"), &ParticipantPatch::Reject)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ReviewStateConflict { .. }));
        let err = store
            .update(Pool::Onsite17, &ParticipantId::from("43"), &ParticipantPatch::Approve)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::ReviewStateConflict { .. }));

        let row = store.get(Pool::Onsite17, &ParticipantId::from("42")).await.unwrap();
        assert!(row.approved && !row.rejected);
        let row = store.get(Pool::Onsite17, &ParticipantId::from("43")).await.unwrap();
        assert!(row.rejected && !row.approved);
        assert!(store.applied_patches().await.is_empty());
    }

    #[tokio::test]
    async fn injected_failures_surface_as_unavailable() {
        let store = InMemoryRecordStore::new();
        store.insert(Pool::Online24, record("1")).await;
        store.fail_lists(true);
        assert!(matches!(
            store.list(Pool::Online24).await,
            Err(StoreError::Unavailable(_))
        ));
        store.fail_lists(false);
        assert_eq!(store.list(Pool::Online24).await.unwrap().len(), 1);
    }
}
