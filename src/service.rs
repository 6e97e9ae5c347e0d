// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Workout Service
//!
//! The operations the UI calls. Every write lands in the [`LocalStore`]
//! first and then, for authenticated users, tries an immediate push with
//! bounded retry. A push that still fails puts the record id into the
//! [`PendingLedger`]; the write itself never fails because of the network.
//!
//! Guests keep everything on the device: no remote reads, no remote writes,
//! and deletes are hard deletes.

use crate::adapter::RemoteSyncAdapter;
use crate::catalog;
use crate::config::RetryConfig;
use crate::constants::messages;
use crate::errors::{SyncError, SyncResult};
use crate::ledger::PendingLedger;
use crate::logging::SyncLogger;
use crate::models::{
    generate_record_id, DraftWorkout, ExerciseCatalogItem, ExerciseCategory, NewCustomExercise, NewWorkout,
    UserIdentity, WorkoutRecord, WorkoutUpdate,
};
use crate::store::LocalStore;
use crate::title::{self, TitleInput};
use chrono::{Local, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use tracing::{debug, info, warn};

/// Items still waiting for the remote store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingCount {
    pub workouts: usize,
    pub exercises: usize,
}

impl PendingCount {
    pub fn total(&self) -> usize {
        self.workouts + self.exercises
    }
}

/// Run `operation` up to `policy.max_attempts` times, sleeping with
/// exponential backoff between attempts. Only transient errors are retried.
///
/// Returns the last error together with the number of attempts made.
pub async fn retry_with_backoff<T, F, Fut>(policy: &RetryConfig, mut operation: F) -> Result<(T, u32), (SyncError, u32)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = SyncResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(value) => return Ok((value, attempt)),
            Err(e) if !e.is_transient() || attempt >= max_attempts => return Err((e, attempt)),
            Err(e) => {
                let delay = policy.delay_after(attempt);
                debug!(retry.attempt = attempt, retry.delay_ms = delay.as_millis() as u64, "Retrying after: {}", e);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

pub struct WorkoutService {
    identity: UserIdentity,
    store: LocalStore,
    ledger: PendingLedger,
    adapter: RemoteSyncAdapter,
    retry: RetryConfig,
}

impl WorkoutService {
    pub fn new(
        identity: UserIdentity,
        store: LocalStore,
        ledger: PendingLedger,
        adapter: RemoteSyncAdapter,
        retry: RetryConfig,
    ) -> Self {
        Self {
            identity,
            store,
            ledger,
            adapter,
            retry,
        }
    }

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn ledger(&self) -> &PendingLedger {
        &self.ledger
    }

    pub fn adapter(&self) -> &RemoteSyncAdapter {
        &self.adapter
    }

    fn is_guest(&self) -> bool {
        self.identity.is_anonymous
    }

    // ========================================================================
    // Workouts
    // ========================================================================

    pub async fn create_workout(&self, input: NewWorkout) -> SyncResult<WorkoutRecord> {
        let record = WorkoutRecord::create(&self.identity.user_id, input);
        self.store.put(record.clone()).await?;
        info!(workout.id = %record.id, "Workout saved locally");

        if self.is_guest() {
            debug!(workout.id = %record.id, "Guest session, skipping push");
            return Ok(record);
        }

        self.push_or_enqueue(&record).await?;
        Ok(self.store.get_by_id(&record.id).await?.unwrap_or(record))
    }

    pub async fn update_workout(&self, id: &str, update: WorkoutUpdate) -> SyncResult<WorkoutRecord> {
        let mut record = self
            .store
            .get_by_id(id)
            .await?
            .ok_or_else(|| SyncError::NotFound(id.to_string()))?;

        record.apply_update(update, Utc::now());
        self.store.put(record.clone()).await?;

        if self.is_guest() {
            return Ok(record);
        }

        self.push_or_enqueue(&record).await?;
        Ok(self.store.get_by_id(id).await?.unwrap_or(record))
    }

    /// Soft delete, then remote delete, then hard delete. Absent ids are a no-op.
    pub async fn delete_workout(&self, id: &str) -> SyncResult<()> {
        let Some(mut record) = self.store.get_by_id(id).await? else {
            return Ok(());
        };

        if self.is_guest() {
            return self.store.remove(id).await;
        }

        record.mark_deleted(Utc::now());
        self.store.put(record).await?;

        match retry_with_backoff(&self.retry, || self.adapter.delete(id)).await {
            Ok(_) => {
                self.store.remove(id).await?;
                self.ledger.remove(id).await?;
                info!(workout.id = %id, "Workout deleted");
            }
            Err((e, attempts)) => {
                // the tombstone is retried by the next sync cycle
                warn!(workout.id = %id, delete.attempts = attempts, "Remote delete failed: {}", e);
                self.ledger.add(id).await?;
            }
        }
        Ok(())
    }

    /// Cached workouts, refreshed from the remote store when reachable
    pub async fn get_workouts(&self) -> SyncResult<Vec<WorkoutRecord>> {
        self.ledger.cleanup(&self.store).await?;

        if !self.is_guest() {
            if let Err(e) = self.adapter.reconcile(&self.identity.user_id, &self.ledger).await {
                debug!("Using cached workouts: {}", e);
            }
        }

        self.store.get_workouts().await
    }

    pub async fn get_workout_by_id(&self, id: &str) -> SyncResult<Option<WorkoutRecord>> {
        self.store.get_by_id(id).await
    }

    /// Unsynced records that were edited after creation
    pub async fn get_conflicted_workouts(&self) -> SyncResult<Vec<WorkoutRecord>> {
        Ok(self
            .store
            .get_workouts()
            .await?
            .into_iter()
            .filter(|w| !w.synced && w.updated_at != w.created_at)
            .collect())
    }

    pub async fn get_pending_sync_count(&self) -> SyncResult<PendingCount> {
        self.ledger.cleanup(&self.store).await?;
        Ok(PendingCount {
            workouts: self.ledger.list().await?.len(),
            exercises: self.ledger.list_exercises().await?.len(),
        })
    }

    async fn push_or_enqueue(&self, record: &WorkoutRecord) -> SyncResult<()> {
        match retry_with_backoff(&self.retry, || self.adapter.push(record)).await {
            Ok(((), attempts)) => {
                SyncLogger::log_push_outcome(&record.id, attempts, true, None);
                let synced = self
                    .store
                    .get_by_id(&record.id)
                    .await?
                    .is_some_and(|stored| stored.synced);
                if synced {
                    self.ledger.remove(&record.id).await?;
                }
            }
            Err((e, attempts)) => {
                SyncLogger::log_push_outcome(&record.id, attempts, false, Some(&e.to_string()));
                self.ledger.add(&record.id).await?;
            }
        }
        Ok(())
    }

    // ========================================================================
    // Exercises
    // ========================================================================

    /// Built-in catalog plus the user's custom exercises; cached list on failure
    pub async fn get_exercises(&self) -> SyncResult<Vec<ExerciseCatalogItem>> {
        match self.load_exercises().await {
            Ok(exercises) => {
                self.store.cache_exercises(&exercises).await?;
                Ok(exercises)
            }
            Err(e) => {
                warn!("Loading exercises failed, using cache: {}", e);
                self.store.get_exercises().await
            }
        }
    }

    async fn load_exercises(&self) -> SyncResult<Vec<ExerciseCatalogItem>> {
        let mut exercises = catalog::builtin_exercises()?;

        let custom = if self.is_guest() {
            self.store
                .get_exercises()
                .await?
                .into_iter()
                .filter(|e| e.is_custom)
                .collect()
        } else {
            let mut fetched = self.adapter.fetch_user_exercises(&self.identity.user_id).await?;
            // queued submissions stay listed until the remote store has them
            for queued in self.ledger.list_exercises().await? {
                if !fetched.iter().any(|e| e.id == queued.id) {
                    fetched.push(queued);
                }
            }
            fetched
        };

        exercises.extend(custom);
        Ok(exercises)
    }

    /// Create an unapproved custom exercise and submit it for review
    pub async fn create_custom_exercise(&self, input: NewCustomExercise) -> SyncResult<ExerciseCatalogItem> {
        let exercise = ExerciseCatalogItem {
            id: generate_record_id("exercise"),
            category: input.category.or(Some(if input.bw == 1 {
                ExerciseCategory::Bodyweight
            } else {
                ExerciseCategory::Strength
            })),
            muscle_groups: input
                .muscle_groups
                .or_else(|| Some(catalog::infer_muscle_groups(&input.name))),
            name: input.name,
            popularity: input.popularity,
            bw: input.bw,
            is_custom: true,
            created_by: Some(self.identity.user_id.clone()),
            is_approved: Some(false),
        };

        if !self.is_guest() {
            if let Err(e) = self
                .adapter
                .submit_custom_exercise(&self.identity.user_id, &exercise)
                .await
            {
                warn!(exercise.id = %exercise.id, "Custom exercise queued for later: {}", e);
                self.ledger.add_exercise(exercise.clone()).await?;
            }
        }

        self.store.add_cached_exercise(exercise.clone()).await?;
        Ok(exercise)
    }

    /// Deliver queued custom exercises; returns one error string per failure
    pub async fn sync_pending_exercises(&self) -> SyncResult<Vec<String>> {
        if self.is_guest() {
            return Err(SyncError::Permission(messages::ANONYMOUS_SYNC_DENIED.to_string()));
        }
        let pending = self.ledger.list_exercises().await?;
        let mut delivered = Vec::new();
        let mut errors = Vec::new();

        for exercise in &pending {
            match self
                .adapter
                .submit_custom_exercise(&self.identity.user_id, exercise)
                .await
            {
                Ok(()) => delivered.push(exercise.id.clone()),
                Err(e) => errors.push(format!("Failed to sync exercise {}: {}", exercise.id, e)),
            }
        }

        self.ledger.remove_exercises(&delivered).await?;
        Ok(errors)
    }

    // ========================================================================
    // Draft slot
    // ========================================================================

    pub async fn get_draft(&self) -> SyncResult<Option<DraftWorkout>> {
        self.store.get_draft().await
    }

    pub async fn save_draft(&self, mut draft: DraftWorkout) -> SyncResult<DraftWorkout> {
        draft.last_modified = Utc::now();
        self.store.save_draft(&draft).await?;
        Ok(draft)
    }

    pub async fn clear_draft(&self) -> SyncResult<()> {
        self.store.clear_draft().await
    }

    /// Save the draft as a workout and clear the slot; untitled drafts get a
    /// suggested title
    pub async fn publish_draft(&self) -> SyncResult<Option<WorkoutRecord>> {
        let Some(draft) = self.store.get_draft().await? else {
            return Ok(None);
        };

        let title = if draft.title.trim().is_empty() {
            let same_day_titles: Vec<String> = self
                .store
                .get_workouts()
                .await?
                .into_iter()
                .filter(|w| w.date == draft.date)
                .map(|w| w.title)
                .collect();
            title::default_title(TitleInput {
                exercises: &draft.exercises,
                cardio_sessions: &draft.cardio_sessions,
                local_hour: Local::now().hour(),
                same_day_titles: &same_day_titles,
                personal_record: false,
            })
        } else {
            draft.title.trim().to_string()
        };

        let record = self
            .create_workout(NewWorkout {
                title,
                date: draft.date,
                exercises: draft.exercises,
                cardio_sessions: draft.cardio_sessions,
                duration: None,
                notes: draft.notes,
            })
            .await?;

        self.store.clear_draft().await?;
        Ok(Some(record))
    }
}
