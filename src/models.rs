// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Data Models
//!
//! Core data structures persisted locally and mirrored to the remote
//! document store.
//!
//! ## Design Principles
//!
//! - **Wire compatible**: field names are camelCase, matching the documents
//!   already stored remotely and in device caches
//! - **Explicit nulls**: optional fields are always serialized, as `null` when
//!   absent, because the remote store rejects missing-versus-undefined values
//! - **Lenient reads**: collections and flags default when absent so older
//!   cached documents still load
//!
//! ## Core Models
//!
//! - [`WorkoutRecord`]: a single logged workout, the unit of sync
//! - [`ExerciseEntry`] / [`SetEntry`]: strength work nested in a workout
//! - [`CardioEntry`]: cardio work nested in a workout
//! - [`ExerciseCatalogItem`]: an entry of the exercise catalog
//! - [`DraftWorkout`]: the UI's in-progress workout

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Who owns the current session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub user_id: String,
    /// Guests keep their data on the device only
    pub is_anonymous: bool,
}

impl UserIdentity {
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_anonymous: false,
        }
    }

    pub fn anonymous(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            is_anonymous: true,
        }
    }
}

/// A logged workout
///
/// # Examples
///
/// ```rust
/// use workout_sync::models::{NewWorkout, WorkoutRecord};
///
/// let workout = WorkoutRecord::create("user-1", NewWorkout::titled("Leg Day", "2024-05-01"));
/// assert!(workout.id.starts_with("workout_"));
/// assert!(!workout.synced);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutRecord {
    /// Client-generated id, `workout_<millis>_<random>`
    #[serde(default)]
    pub id: String,
    /// Owner, immutable after creation
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub title: String,
    /// ISO date (`YYYY-MM-DD` or full timestamp)
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub exercises: Vec<ExerciseEntry>,
    #[serde(default)]
    pub cardio_sessions: Vec<CardioEntry>,
    /// Total workout time in minutes
    pub duration: Option<f64>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Bumped on every mutation
    pub updated_at: DateTime<Utc>,
    /// True iff the remote copy is known to match this content
    #[serde(default)]
    pub synced: bool,
    /// Soft-delete marker
    #[serde(default)]
    pub is_deleted: bool,
}

impl WorkoutRecord {
    /// Build a fresh, unsynced record owned by `user_id`
    pub fn create(user_id: &str, input: NewWorkout) -> Self {
        let now = Utc::now();
        Self {
            id: generate_record_id("workout"),
            user_id: user_id.to_string(),
            title: input.title,
            date: input.date,
            exercises: input.exercises,
            cardio_sessions: input.cardio_sessions,
            duration: input.duration,
            notes: input.notes,
            created_at: now,
            updated_at: now,
            synced: false,
            is_deleted: false,
        }
    }

    /// Visible to read APIs
    pub fn is_active(&self) -> bool {
        !self.is_deleted
    }

    /// Apply a partial update, bump `updated_at` and mark the record dirty
    pub fn apply_update(&mut self, update: WorkoutUpdate, now: DateTime<Utc>) {
        if let Some(title) = update.title {
            self.title = title;
        }
        if let Some(date) = update.date {
            self.date = date;
        }
        if let Some(exercises) = update.exercises {
            self.exercises = exercises;
        }
        if let Some(cardio) = update.cardio_sessions {
            self.cardio_sessions = cardio;
        }
        if let Some(duration) = update.duration {
            self.duration = duration;
        }
        if let Some(notes) = update.notes {
            self.notes = notes;
        }
        self.updated_at = now;
        self.synced = false;
    }

    /// Soft delete: keeps the record locally until the remote delete lands
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.is_deleted = true;
        self.updated_at = now;
        self.synced = false;
    }

    pub fn total_sets(&self) -> usize {
        self.exercises.iter().map(|e| e.sets.len()).sum()
    }
}

/// Strength exercise performed within a workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseEntry {
    /// Scoped to the owning workout
    pub id: String,
    /// References [`ExerciseCatalogItem::id`]
    pub exercise_id: String,
    /// Cached for offline display
    pub exercise_name: String,
    #[serde(default)]
    pub sets: Vec<SetEntry>,
    pub notes: Option<String>,
    /// Position within the workout
    #[serde(default)]
    pub order: u32,
}

impl ExerciseEntry {
    pub fn new(exercise_id: impl Into<String>, exercise_name: impl Into<String>, order: u32) -> Self {
        Self {
            id: generate_record_id("entry"),
            exercise_id: exercise_id.into(),
            exercise_name: exercise_name.into(),
            sets: Vec::new(),
            notes: None,
            order,
        }
    }

    pub fn with_sets(mut self, sets: Vec<SetEntry>) -> Self {
        self.sets = sets;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetEntry {
    pub id: String,
    pub reps: Option<u32>,
    /// Load in kg or lbs; not a total-lift contributor when bodyweight
    pub weight: Option<f64>,
    /// Seconds, for timed sets
    pub duration: Option<f64>,
    /// km or miles, for distance sets
    pub distance: Option<f64>,
    #[serde(default)]
    pub is_bodyweight: bool,
    /// Seconds
    pub rest_time: Option<u32>,
    pub notes: Option<String>,
}

impl SetEntry {
    pub fn weighted(reps: u32, weight: f64) -> Self {
        Self {
            id: generate_record_id("set"),
            reps: Some(reps),
            weight: Some(weight),
            duration: None,
            distance: None,
            is_bodyweight: false,
            rest_time: None,
            notes: None,
        }
    }

    pub fn bodyweight(reps: u32) -> Self {
        Self {
            weight: None,
            is_bodyweight: true,
            ..Self::weighted(reps, 0.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardioType {
    Running,
    Cycling,
    Swimming,
    Walking,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intensity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardioEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CardioType,
    /// Minutes
    pub duration: f64,
    pub distance: Option<f64>,
    pub intensity: Option<Intensity>,
    pub calories: Option<u32>,
    pub notes: Option<String>,
}

impl CardioEntry {
    pub fn new(kind: CardioType, duration: f64) -> Self {
        Self {
            id: generate_record_id("cardio"),
            kind,
            duration,
            distance: None,
            intensity: None,
            calories: None,
            notes: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExerciseCategory {
    Strength,
    Cardio,
    Bodyweight,
}

/// Entry of the exercise catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseCatalogItem {
    pub id: String,
    pub name: String,
    /// Ordering weight, higher first
    #[serde(default)]
    pub popularity: f64,
    /// 0 = weighted, 1 = bodyweight
    #[serde(default)]
    pub bw: u8,
    pub category: Option<ExerciseCategory>,
    pub muscle_groups: Option<Vec<String>>,
    #[serde(default)]
    pub is_custom: bool,
    pub created_by: Option<String>,
    /// Custom entries stay unapproved until reviewed
    pub is_approved: Option<bool>,
}

impl ExerciseCatalogItem {
    pub fn is_bodyweight(&self) -> bool {
        self.bw == 1
    }
}

/// Input of [`crate::service::WorkoutService::create_workout`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkout {
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub exercises: Vec<ExerciseEntry>,
    #[serde(default)]
    pub cardio_sessions: Vec<CardioEntry>,
    pub duration: Option<f64>,
    pub notes: Option<String>,
}

impl NewWorkout {
    pub fn titled(title: impl Into<String>, date: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            date: date.into(),
            ..Self::default()
        }
    }
}

/// Partial update; `None` leaves a field untouched, `Some(None)` clears an
/// optional field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorkoutUpdate {
    pub title: Option<String>,
    pub date: Option<String>,
    pub exercises: Option<Vec<ExerciseEntry>>,
    pub cardio_sessions: Option<Vec<CardioEntry>>,
    pub duration: Option<Option<f64>>,
    pub notes: Option<Option<String>>,
}

/// Input of [`crate::service::WorkoutService::create_custom_exercise`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomExercise {
    pub name: String,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub bw: u8,
    pub category: Option<ExerciseCategory>,
    pub muscle_groups: Option<Vec<String>>,
}

/// Workout being built in the UI; persists until saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftWorkout {
    pub id: String,
    #[serde(default)]
    pub title: String,
    /// `YYYY-MM-DD`
    pub date: String,
    #[serde(default)]
    pub exercises: Vec<ExerciseEntry>,
    #[serde(default)]
    pub cardio_sessions: Vec<CardioEntry>,
    pub notes: Option<String>,
    #[serde(default = "draft_marker")]
    pub is_draft: bool,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

fn draft_marker() -> bool {
    true
}

impl DraftWorkout {
    pub fn new(date: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: generate_record_id("draft"),
            title: String::new(),
            date: date.into(),
            exercises: Vec::new(),
            cardio_sessions: Vec::new(),
            notes: None,
            is_draft: true,
            created_at: now,
            last_modified: now,
        }
    }
}

/// Generate `<prefix>_<unix millis>_<9 base36 chars>`
pub fn generate_record_id(prefix: &str) -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    let suffix: String = (0..9)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect();
    format!("{prefix}_{}_{suffix}", Utc::now().timestamp_millis())
}
