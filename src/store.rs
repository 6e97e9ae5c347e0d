// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Local Record Store
//!
//! Ground truth while offline. Workouts live as one serialized collection
//! under [`storage_keys::WORKOUTS`]; every mutation reads the full collection,
//! edits it in memory and writes it back. The read-modify-write cycle is
//! serialized behind an async mutex so concurrent tasks cannot interleave
//! writers. The store never performs network I/O.

use crate::constants::storage_keys;
use crate::errors::SyncResult;
use crate::merge;
use crate::models::{DraftWorkout, ExerciseCatalogItem, WorkoutRecord};
use crate::storage::KeyValueStore;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct LocalStore {
    kv: Arc<dyn KeyValueStore>,
    write_lock: Arc<Mutex<()>>,
}

impl LocalStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Backing key-value store, shared with the ledger
    pub fn backend(&self) -> Arc<dyn KeyValueStore> {
        self.kv.clone()
    }

    // ========================================================================
    // Workouts
    // ========================================================================

    /// Every record, soft-deleted ones included
    pub async fn get_all(&self) -> SyncResult<Vec<WorkoutRecord>> {
        read_collection(self.kv.as_ref(), storage_keys::WORKOUTS).await
    }

    /// Records visible to callers
    pub async fn get_workouts(&self) -> SyncResult<Vec<WorkoutRecord>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .filter(WorkoutRecord::is_active)
            .collect())
    }

    /// First non-deleted record with this id
    pub async fn get_by_id(&self, id: &str) -> SyncResult<Option<WorkoutRecord>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .find(|w| w.id == id && w.is_active()))
    }

    /// Soft-deleted records still waiting for remote deletion
    pub async fn get_tombstones(&self) -> SyncResult<Vec<WorkoutRecord>> {
        Ok(self
            .get_all()
            .await?
            .into_iter()
            .filter(|w| w.is_deleted)
            .collect())
    }

    /// Upsert by id, appending when new
    pub async fn put(&self, record: WorkoutRecord) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut workouts = self.get_all().await?;

        match workouts.iter_mut().find(|w| w.id == record.id) {
            Some(existing) => *existing = record,
            None => workouts.push(record),
        }

        write_collection(self.kv.as_ref(), storage_keys::WORKOUTS, &workouts).await
    }

    /// Mark the record synced if it still carries the pushed revision.
    ///
    /// Returns false when the record is gone or was edited after the push.
    pub async fn mark_synced(&self, id: &str, pushed_revision: DateTime<Utc>) -> SyncResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut workouts = self.get_all().await?;

        let Some(record) = workouts.iter_mut().find(|w| w.id == id) else {
            return Ok(false);
        };
        if record.updated_at != pushed_revision {
            debug!(workout.id = %id, "Record changed during push, leaving it unsynced");
            return Ok(false);
        }
        record.synced = true;

        write_collection(self.kv.as_ref(), storage_keys::WORKOUTS, &workouts).await?;
        Ok(true)
    }

    /// Hard delete; only after the remote delete is confirmed
    pub async fn remove(&self, id: &str) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut workouts = self.get_all().await?;
        let before = workouts.len();
        workouts.retain(|w| w.id != id);

        if workouts.len() != before {
            write_collection(self.kv.as_ref(), storage_keys::WORKOUTS, &workouts).await?;
        }
        Ok(())
    }

    /// Merge pulled remote records into the collection under the write lock;
    /// returns the stored collection
    pub async fn apply_remote(&self, remote: Vec<WorkoutRecord>, now: DateTime<Utc>) -> SyncResult<Vec<WorkoutRecord>> {
        let _guard = self.write_lock.lock().await;
        let local = self.get_all().await?;
        let merged = merge::merge_preserving_tombstones(local, remote, now);
        write_collection(self.kv.as_ref(), storage_keys::WORKOUTS, &merged).await?;
        debug!(store.size = merged.len(), "Applied remote state");
        Ok(merged)
    }

    /// Clear the synced flag everywhere; returns ids of non-deleted records
    pub async fn mark_all_unsynced(&self) -> SyncResult<Vec<String>> {
        let _guard = self.write_lock.lock().await;
        let mut workouts = self.get_all().await?;
        for workout in workouts.iter_mut() {
            workout.synced = false;
        }
        write_collection(self.kv.as_ref(), storage_keys::WORKOUTS, &workouts).await?;

        Ok(workouts
            .into_iter()
            .filter(WorkoutRecord::is_active)
            .map(|w| w.id)
            .collect())
    }

    // ========================================================================
    // Exercise catalog cache
    // ========================================================================

    pub async fn get_exercises(&self) -> SyncResult<Vec<ExerciseCatalogItem>> {
        read_collection(self.kv.as_ref(), storage_keys::EXERCISES).await
    }

    pub async fn cache_exercises(&self, exercises: &[ExerciseCatalogItem]) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        write_collection(self.kv.as_ref(), storage_keys::EXERCISES, exercises).await
    }

    pub async fn add_cached_exercise(&self, exercise: ExerciseCatalogItem) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut exercises = self.get_exercises().await?;
        if !exercises.iter().any(|e| e.id == exercise.id) {
            exercises.push(exercise);
        }
        write_collection(self.kv.as_ref(), storage_keys::EXERCISES, &exercises).await
    }

    // ========================================================================
    // Sync metadata
    // ========================================================================

    pub async fn get_last_sync_time(&self) -> SyncResult<Option<DateTime<Utc>>> {
        let Some(raw) = self.kv.get(storage_keys::LAST_SYNC_TIME).await? else {
            return Ok(None);
        };
        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(parsed) => Ok(Some(parsed.with_timezone(&Utc))),
            Err(e) => {
                warn!("Ignoring unreadable last sync time {:?}: {}", raw, e);
                Ok(None)
            }
        }
    }

    pub async fn set_last_sync_time(&self, at: DateTime<Utc>) -> SyncResult<()> {
        self.kv.set(storage_keys::LAST_SYNC_TIME, at.to_rfc3339()).await
    }

    // ========================================================================
    // Draft slot
    // ========================================================================

    pub async fn get_draft(&self) -> SyncResult<Option<DraftWorkout>> {
        let Some(raw) = self.kv.get(storage_keys::CURRENT_DRAFT_WORKOUT).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(draft) => Ok(Some(draft)),
            Err(e) => {
                warn!("Discarding unreadable draft workout: {}", e);
                Ok(None)
            }
        }
    }

    pub async fn save_draft(&self, draft: &DraftWorkout) -> SyncResult<()> {
        self.kv
            .set(storage_keys::CURRENT_DRAFT_WORKOUT, serde_json::to_string(draft)?)
            .await
    }

    pub async fn clear_draft(&self) -> SyncResult<()> {
        self.kv.remove(storage_keys::CURRENT_DRAFT_WORKOUT).await
    }
}

/// Read a JSON collection; a missing or corrupt value reads as empty
pub(crate) async fn read_collection<T: DeserializeOwned>(
    kv: &dyn KeyValueStore,
    key: &str,
) -> SyncResult<Vec<T>> {
    let Some(raw) = kv.get(key).await? else {
        return Ok(Vec::new());
    };
    match serde_json::from_str(&raw) {
        Ok(items) => Ok(items),
        Err(e) => {
            warn!(storage.key = %key, "Unreadable collection, treating as empty: {}", e);
            Ok(Vec::new())
        }
    }
}

pub(crate) async fn write_collection<T: Serialize>(
    kv: &dyn KeyValueStore,
    key: &str,
    items: &[T],
) -> SyncResult<()> {
    kv.set(key, serde_json::to_string(items)?).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewWorkout;
    use crate::storage::MemoryKeyValueStore;

    fn store() -> LocalStore {
        LocalStore::new(Arc::new(MemoryKeyValueStore::new()))
    }

    fn workout(title: &str) -> WorkoutRecord {
        WorkoutRecord::create("user-1", NewWorkout::titled(title, "2024-03-01"))
    }

    #[tokio::test]
    async fn test_put_upserts_by_id() {
        let store = store();
        let mut record = workout("Push");
        store.put(record.clone()).await.unwrap();

        record.title = "Push Day".to_string();
        store.put(record.clone()).await.unwrap();

        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Push Day");
    }

    #[tokio::test]
    async fn test_soft_deleted_records_are_hidden() {
        let store = store();
        let mut record = workout("Pull");
        record.mark_deleted(Utc::now());
        store.put(record.clone()).await.unwrap();

        assert!(store.get_workouts().await.unwrap().is_empty());
        assert!(store.get_by_id(&record.id).await.unwrap().is_none());
        assert_eq!(store.get_all().await.unwrap().len(), 1);
        assert_eq!(store.get_tombstones().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_hard_deletes() {
        let store = store();
        let record = workout("Legs");
        store.put(record.clone()).await.unwrap();
        store.remove(&record.id).await.unwrap();
        store.remove("does-not-exist").await.unwrap();

        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_synced_respects_revision() {
        let store = store();
        let record = workout("Arms");
        store.put(record.clone()).await.unwrap();

        let stale = record.updated_at - chrono::Duration::seconds(1);
        assert!(!store.mark_synced(&record.id, stale).await.unwrap());
        assert!(!store.get_by_id(&record.id).await.unwrap().unwrap().synced);

        assert!(store.mark_synced(&record.id, record.updated_at).await.unwrap());
        assert!(store.get_by_id(&record.id).await.unwrap().unwrap().synced);

        assert!(!store.mark_synced("gone", record.updated_at).await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_collection_reads_empty() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        kv.set(storage_keys::WORKOUTS, "{not json".to_string()).await.unwrap();
        let store = LocalStore::new(kv);

        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_last_sync_time_roundtrip_and_garbage() {
        let kv = Arc::new(MemoryKeyValueStore::new());
        let store = LocalStore::new(kv.clone());
        assert!(store.get_last_sync_time().await.unwrap().is_none());

        let now = Utc::now();
        store.set_last_sync_time(now).await.unwrap();
        assert_eq!(store.get_last_sync_time().await.unwrap(), Some(now));

        kv.set(storage_keys::LAST_SYNC_TIME, "yesterday".to_string()).await.unwrap();
        assert!(store.get_last_sync_time().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_draft_slot() {
        let store = store();
        assert!(store.get_draft().await.unwrap().is_none());

        let draft = DraftWorkout::new("2024-03-02");
        store.save_draft(&draft).await.unwrap();
        assert_eq!(store.get_draft().await.unwrap(), Some(draft));

        store.clear_draft().await.unwrap();
        assert!(store.get_draft().await.unwrap().is_none());
    }

    fn custom_exercise(id: &str) -> ExerciseCatalogItem {
        ExerciseCatalogItem {
            id: id.to_string(),
            name: id.to_string(),
            popularity: 0.0,
            bw: 0,
            category: None,
            muscle_groups: None,
            is_custom: true,
            created_by: Some("user-1".to_string()),
            is_approved: Some(false),
        }
    }

    #[tokio::test]
    async fn test_cache_refresh_and_append_do_not_lose_writes() {
        let store = store();
        let refreshed = vec![custom_exercise("exercise_refreshed")];

        for i in 0..25 {
            let appended = custom_exercise(&format!("exercise_appended_{i}"));
            let (append, refresh) = tokio::join!(
                store.add_cached_exercise(appended),
                store.cache_exercises(&refreshed)
            );
            append.unwrap();
            refresh.unwrap();

            let cached = store.get_exercises().await.unwrap();
            assert!(cached.iter().any(|e| e.id == "exercise_refreshed"));
        }
    }
}
