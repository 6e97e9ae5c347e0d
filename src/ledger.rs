// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Pending Upload Ledger
//!
//! Durable set of workout ids whose local content has not reached the remote
//! store yet, plus the queue of custom exercises awaiting remote creation.
//!
//! The ledger heals itself: [`PendingLedger::cleanup`] drops ids whose record
//! no longer exists or was soft-deleted, so stale entries never inflate the
//! "N pending" count or keep a sync cycle retrying an unrecoverable record.

use crate::constants::storage_keys;
use crate::errors::SyncResult;
use crate::models::ExerciseCatalogItem;
use crate::storage::KeyValueStore;
use crate::store::{read_collection, write_collection, LocalStore};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

#[derive(Clone)]
pub struct PendingLedger {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl PendingLedger {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Idempotent insert
    pub async fn add(&self, id: &str) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut pending = self.list().await?;
        if pending.iter().any(|p| p == id) {
            return Ok(());
        }
        pending.push(id.to_string());
        debug!(workout.id = %id, ledger.size = pending.len(), "Queued for upload");
        write_collection(self.kv.as_ref(), storage_keys::PENDING_UPLOADS, &pending).await
    }

    /// Tracked ids in insertion order
    pub async fn list(&self) -> SyncResult<Vec<String>> {
        read_collection(self.kv.as_ref(), storage_keys::PENDING_UPLOADS).await
    }

    pub async fn contains(&self, id: &str) -> SyncResult<bool> {
        Ok(self.list().await?.iter().any(|p| p == id))
    }

    /// Idempotent delete
    pub async fn remove(&self, id: &str) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut pending = self.list().await?;
        let before = pending.len();
        pending.retain(|p| p != id);
        if pending.len() == before {
            return Ok(());
        }
        write_collection(self.kv.as_ref(), storage_keys::PENDING_UPLOADS, &pending).await
    }

    /// Drop ids whose record is missing or soft-deleted; returns the dropped ids
    pub async fn cleanup(&self, store: &LocalStore) -> SyncResult<Vec<String>> {
        let _guard = self.write_lock.lock().await;
        let pending = self.list().await?;
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let live: HashSet<String> = store
            .get_workouts()
            .await?
            .into_iter()
            .map(|w| w.id)
            .collect();

        let mut seen = HashSet::new();
        let (valid, stale): (Vec<String>, Vec<String>) = pending
            .into_iter()
            .partition(|id| live.contains(id) && seen.insert(id.clone()));

        if !stale.is_empty() {
            info!(ledger.dropped = stale.len(), ledger.remaining = valid.len(), "Cleaned stale pending uploads");
            write_collection(self.kv.as_ref(), storage_keys::PENDING_UPLOADS, &valid).await?;
        }

        Ok(stale)
    }

    // ========================================================================
    // Custom exercises awaiting remote creation
    // ========================================================================

    /// Queue a custom exercise, deduplicated by id
    pub async fn add_exercise(&self, exercise: ExerciseCatalogItem) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut pending = self.list_exercises().await?;
        if pending.iter().any(|e| e.id == exercise.id) {
            return Ok(());
        }
        pending.push(exercise);
        write_collection(self.kv.as_ref(), storage_keys::PENDING_EXERCISE_UPLOADS, &pending).await
    }

    pub async fn list_exercises(&self) -> SyncResult<Vec<ExerciseCatalogItem>> {
        read_collection(self.kv.as_ref(), storage_keys::PENDING_EXERCISE_UPLOADS).await
    }

    /// Remove delivered exercises; drops the key once the queue is empty
    pub async fn remove_exercises(&self, ids: &[String]) -> SyncResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let _guard = self.write_lock.lock().await;
        let mut pending = self.list_exercises().await?;
        pending.retain(|e| !ids.contains(&e.id));

        if pending.is_empty() {
            self.kv.remove(storage_keys::PENDING_EXERCISE_UPLOADS).await
        } else {
            write_collection(self.kv.as_ref(), storage_keys::PENDING_EXERCISE_UPLOADS, &pending).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewWorkout, WorkoutRecord};
    use crate::storage::MemoryKeyValueStore;
    use chrono::Utc;

    fn setup() -> (LocalStore, PendingLedger) {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        (LocalStore::new(kv.clone()), PendingLedger::new(kv))
    }

    fn custom_exercise(id: &str) -> ExerciseCatalogItem {
        ExerciseCatalogItem {
            id: id.to_string(),
            name: "Zercher Squat".to_string(),
            popularity: 1.0,
            bw: 0,
            category: None,
            muscle_groups: None,
            is_custom: true,
            created_by: Some("user-1".to_string()),
            is_approved: Some(false),
        }
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let (_, ledger) = setup();
        ledger.add("w1").await.unwrap();
        ledger.add("w1").await.unwrap();
        ledger.add("w2").await.unwrap();

        assert_eq!(ledger.list().await.unwrap(), vec!["w1", "w2"]);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let (_, ledger) = setup();
        ledger.add("w1").await.unwrap();
        ledger.remove("w1").await.unwrap();
        ledger.remove("w1").await.unwrap();

        assert!(ledger.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_drops_missing_and_deleted() {
        let (store, ledger) = setup();

        let live = WorkoutRecord::create("u", NewWorkout::titled("Live", "2024-01-01"));
        let mut deleted = WorkoutRecord::create("u", NewWorkout::titled("Gone", "2024-01-01"));
        deleted.mark_deleted(Utc::now());
        store.put(live.clone()).await.unwrap();
        store.put(deleted.clone()).await.unwrap();

        ledger.add(&live.id).await.unwrap();
        ledger.add(&deleted.id).await.unwrap();
        ledger.add("hard-deleted").await.unwrap();

        let dropped = ledger.cleanup(&store).await.unwrap();

        assert_eq!(dropped.len(), 2);
        assert_eq!(ledger.list().await.unwrap(), vec![live.id]);
    }

    #[tokio::test]
    async fn test_pending_exercises_queue() {
        let (_, ledger) = setup();
        ledger.add_exercise(custom_exercise("e1")).await.unwrap();
        ledger.add_exercise(custom_exercise("e1")).await.unwrap();
        ledger.add_exercise(custom_exercise("e2")).await.unwrap();
        assert_eq!(ledger.list_exercises().await.unwrap().len(), 2);

        ledger.remove_exercises(&["e1".to_string()]).await.unwrap();
        let remaining = ledger.list_exercises().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "e2");

        ledger.remove_exercises(&["e2".to_string()]).await.unwrap();
        assert!(ledger.list_exercises().await.unwrap().is_empty());
    }
}
