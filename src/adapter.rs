// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Remote Sync Adapter
//!
//! Moves single workout documents between the [`LocalStore`] and a
//! [`RemoteDocumentStore`]. Every remote call is bounded by the configured
//! remote timeout. Failures propagate unchanged; the caller decides whether
//! they end up in the pending ledger or in a sync error string.

use crate::constants::{collections, messages};
use crate::errors::{SyncError, SyncResult};
use crate::ledger::PendingLedger;
use crate::models::{ExerciseCatalogItem, WorkoutRecord};
use crate::remote::{DocumentQuery, RemoteDocumentStore};
use crate::store::LocalStore;
use chrono::Utc;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of a pull-and-merge pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Documents received from the remote store
    pub pulled: usize,
    /// Records stored locally after the merge, tombstones included
    pub stored: usize,
    /// Unsynced records queued for the next drain
    pub requeued: usize,
}

#[derive(Clone)]
pub struct RemoteSyncAdapter {
    remote: Arc<dyn RemoteDocumentStore>,
    store: LocalStore,
    timeout: Duration,
}

impl RemoteSyncAdapter {
    pub fn new(remote: Arc<dyn RemoteDocumentStore>, store: LocalStore, timeout: Duration) -> Self {
        Self { remote, store, timeout }
    }

    pub fn remote(&self) -> Arc<dyn RemoteDocumentStore> {
        self.remote.clone()
    }

    async fn bounded<T>(&self, operation: impl Future<Output = SyncResult<T>>) -> SyncResult<T> {
        tokio::time::timeout(self.timeout, operation)
            .await
            .map_err(|_| SyncError::Timeout(self.timeout))?
    }

    /// Reject records the remote store would refuse
    pub fn validate(record: &WorkoutRecord) -> SyncResult<()> {
        let missing: Vec<&str> = [
            ("id", record.id.trim().is_empty()),
            ("userId", record.user_id.trim().is_empty()),
            ("title", record.title.trim().is_empty()),
        ]
        .into_iter()
        .filter_map(|(field, absent)| absent.then_some(field))
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SyncError::InvalidData(missing.join(", ")))
        }
    }

    /// Remote document for a record.
    ///
    /// Absent optional values serialize as explicit `null` (the models never
    /// skip a field), collections default to empty lists and the document is
    /// stamped `synced: true`.
    pub fn to_document(record: &WorkoutRecord) -> SyncResult<Value> {
        let mut document = serde_json::to_value(record)?;
        if let Value::Object(fields) = &mut document {
            fields.insert("synced".to_string(), Value::Bool(true));
            if record.title.is_empty() {
                fields.insert("title".to_string(), json!(messages::UNTITLED_WORKOUT));
            }
            if record.date.is_empty() {
                fields.insert("date".to_string(), json!(Utc::now().to_rfc3339()));
            }
        }
        Ok(document)
    }

    /// Full-document overwrite keyed by record id, then mark the local copy
    /// synced if it was not edited meanwhile
    pub async fn push(&self, record: &WorkoutRecord) -> SyncResult<()> {
        Self::validate(record)?;
        let document = Self::to_document(record)?;

        self.bounded(self.remote.set_document(collections::WORKOUTS, &record.id, document))
            .await?;

        let marked = self.store.mark_synced(&record.id, record.updated_at).await?;
        debug!(workout.id = %record.id, workout.marked_synced = marked, "Workout document written");
        Ok(())
    }

    /// Every remote workout of `owner`, newest first
    pub async fn pull_all(&self, owner: &str) -> SyncResult<Vec<WorkoutRecord>> {
        let query = DocumentQuery::owned_by(collections::OWNER_FIELD, owner, collections::CREATED_AT_FIELD);
        let documents = self
            .bounded(self.remote.query_documents(collections::WORKOUTS, &query))
            .await?;

        let mut workouts = Vec::with_capacity(documents.len());
        for document in documents {
            let mut data = document.data;
            if let Value::Object(fields) = &mut data {
                fields.insert("id".to_string(), Value::String(document.id.clone()));
            }
            match serde_json::from_value::<WorkoutRecord>(data) {
                Ok(workout) => workouts.push(workout),
                Err(e) => warn!(workout.id = %document.id, "Skipping unreadable remote workout: {}", e),
            }
        }

        debug!(sync.pulled = workouts.len(), "Pulled remote workouts");
        Ok(workouts)
    }

    pub async fn delete(&self, id: &str) -> SyncResult<()> {
        self.bounded(self.remote.delete_document(collections::WORKOUTS, id))
            .await
    }

    /// Pull remote state, merge it into the local store and queue whatever
    /// still needs a push
    pub async fn reconcile(&self, owner: &str, ledger: &PendingLedger) -> SyncResult<ReconcileSummary> {
        let remote = self.pull_all(owner).await?;
        let pulled = remote.len();
        let stored = self.store.apply_remote(remote, Utc::now()).await?;

        let mut requeued = 0;
        for record in &stored {
            if record.is_deleted {
                continue;
            }
            if record.synced {
                ledger.remove(&record.id).await?;
            } else if !ledger.contains(&record.id).await? {
                ledger.add(&record.id).await?;
                requeued += 1;
            }
        }

        Ok(ReconcileSummary {
            pulled,
            stored: stored.len(),
            requeued,
        })
    }

    /// Read the connectivity document; any answer, even "missing", proves
    /// the remote store is reachable
    pub async fn check_remote(&self, timeout: Duration) -> SyncResult<()> {
        tokio::time::timeout(
            timeout,
            self.remote
                .get_document(collections::CONNECTIVITY, collections::CONNECTIVITY_DOCUMENT),
        )
        .await
        .map_err(|_| SyncError::Timeout(timeout))??;
        Ok(())
    }

    /// Write the exercise to the user's collection (keyed by id, so a retry
    /// overwrites) and append it to the review queue
    pub async fn submit_custom_exercise(&self, user_id: &str, exercise: &ExerciseCatalogItem) -> SyncResult<()> {
        let document = serde_json::to_value(exercise)?;
        self.bounded(self.remote.set_document(
            &collections::user_exercises(user_id),
            &exercise.id,
            document.clone(),
        ))
        .await?;

        let mut review = document;
        if let Value::Object(fields) = &mut review {
            fields.insert("submittedAt".to_string(), json!(Utc::now().to_rfc3339()));
            fields.insert("userId".to_string(), json!(user_id));
        }
        self.bounded(self.remote.create_document(collections::EXERCISE_REVIEW_QUEUE, review))
            .await?;

        info!(exercise.id = %exercise.id, "Custom exercise submitted for review");
        Ok(())
    }

    pub async fn fetch_user_exercises(&self, user_id: &str) -> SyncResult<Vec<ExerciseCatalogItem>> {
        let query = DocumentQuery {
            field: "createdBy".to_string(),
            equals: json!(user_id),
            order_by: "name".to_string(),
            descending: false,
        };
        let documents = self
            .bounded(
                self.remote
                    .query_documents(&collections::user_exercises(user_id), &query),
            )
            .await?;

        Ok(documents
            .into_iter()
            .filter_map(|document| {
                let mut data = document.data;
                if let Value::Object(fields) = &mut data {
                    fields.insert("id".to_string(), Value::String(document.id.clone()));
                }
                serde_json::from_value(data)
                    .map_err(|e| warn!(exercise.id = %document.id, "Skipping unreadable exercise: {}", e))
                    .ok()
            })
            .collect())
    }
}
