// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Custom exercise submission across connectivity changes

mod common;

use anyhow::Result;
use async_trait::async_trait;
use common::Session;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use workout_sync::adapter::RemoteSyncAdapter;
use workout_sync::config::RetryConfig;
use workout_sync::constants::collections;
use workout_sync::errors::{SyncError, SyncResult};
use workout_sync::ledger::PendingLedger;
use workout_sync::models::{NewCustomExercise, UserIdentity};
use workout_sync::remote::{DocumentQuery, MemoryDocumentStore, RemoteDocument, RemoteDocumentStore};
use workout_sync::service::WorkoutService;
use workout_sync::storage::{KeyValueStore, MemoryKeyValueStore};
use workout_sync::store::LocalStore;

fn sled_push() -> NewCustomExercise {
    NewCustomExercise {
        name: "Sled Push".to_string(),
        popularity: 0.0,
        bw: 0,
        category: None,
        muscle_groups: None,
    }
}

/// Memory store whose review queue can be taken down on its own
struct ReviewQueueOutage {
    inner: MemoryDocumentStore,
    queue_down: AtomicBool,
}

#[async_trait]
impl RemoteDocumentStore for ReviewQueueOutage {
    async fn set_document(&self, collection: &str, id: &str, document: Value) -> SyncResult<()> {
        self.inner.set_document(collection, id, document).await
    }

    async fn get_document(&self, collection: &str, id: &str) -> SyncResult<Option<Value>> {
        self.inner.get_document(collection, id).await
    }

    async fn query_documents(&self, collection: &str, query: &DocumentQuery) -> SyncResult<Vec<RemoteDocument>> {
        self.inner.query_documents(collection, query).await
    }

    async fn delete_document(&self, collection: &str, id: &str) -> SyncResult<()> {
        self.inner.delete_document(collection, id).await
    }

    async fn create_document(&self, collection: &str, document: Value) -> SyncResult<String> {
        if collection == collections::EXERCISE_REVIEW_QUEUE && self.queue_down.load(Ordering::SeqCst) {
            return Err(SyncError::Remote {
                status: 503,
                message: "review queue unavailable".to_string(),
            });
        }
        self.inner.create_document(collection, document).await
    }
}

#[tokio::test]
async fn test_offline_exercise_stays_listed_after_reconnect() -> Result<()> {
    let session = Session::new(UserIdentity::authenticated("user-1"));
    session.set_online(false);

    let created = session.service.create_custom_exercise(sled_push()).await?;
    assert_eq!(session.service.get_pending_sync_count().await?.exercises, 1);

    session.set_online(true);
    let listed = session.service.get_exercises().await?;

    assert_eq!(listed.iter().filter(|e| e.id == created.id).count(), 1);
    let cached = session.service.store().get_exercises().await?;
    assert!(cached.iter().any(|e| e.id == created.id));
    assert_eq!(session.service.get_pending_sync_count().await?.exercises, 1);

    assert!(session.service.sync_pending_exercises().await?.is_empty());
    let listed = session.service.get_exercises().await?;
    assert_eq!(listed.iter().filter(|e| e.id == created.id).count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_resubmission_does_not_duplicate_user_copy() -> Result<()> {
    let remote = Arc::new(ReviewQueueOutage {
        inner: MemoryDocumentStore::new(),
        queue_down: AtomicBool::new(true),
    });
    let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
    let store = LocalStore::new(kv.clone());
    let adapter = RemoteSyncAdapter::new(remote.clone(), store.clone(), Duration::from_secs(5));
    let service = WorkoutService::new(
        UserIdentity::authenticated("user-1"),
        store,
        PendingLedger::new(kv),
        adapter,
        RetryConfig::immediate(1),
    );

    let created = service.create_custom_exercise(sled_push()).await?;
    assert_eq!(service.ledger().list_exercises().await?.len(), 1);
    assert_eq!(remote.inner.snapshot(&collections::user_exercises("user-1")).await.len(), 1);

    remote.queue_down.store(false, Ordering::SeqCst);
    let errors = service.sync_pending_exercises().await?;

    assert!(errors.is_empty(), "errors: {errors:?}");
    assert!(service.ledger().list_exercises().await?.is_empty());
    let user_copies = remote.inner.snapshot(&collections::user_exercises("user-1")).await;
    assert_eq!(user_copies.len(), 1);
    assert_eq!(user_copies[0].id, created.id);
    assert_eq!(remote.inner.snapshot(collections::EXERCISE_REVIEW_QUEUE).await.len(), 1);

    let listed = service.get_exercises().await?;
    assert_eq!(listed.iter().filter(|e| e.name == "Sled Push").count(), 1);
    Ok(())
}
