// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Merge Resolver
//!
//! Reconciles the local collection with a freshly pulled remote collection.
//!
//! Remote records seed the result. A local record without a remote
//! counterpart is kept as-is; a synced local record defers to the remote
//! copy; an unsynced one goes through [`resolve_conflict`], which compares
//! `updated_at`:
//!
//! | Comparison | Result |
//! |---|---|
//! | local newer | local content, `synced = false` |
//! | remote newer | remote content, `synced = true` |
//! | equal | remote base with local title/notes, longer exercise and cardio lists, `updated_at = now`, `synced = false` |
//!
//! This is a last-writer-wins heuristic, not a CRDT. Whole-list "longer
//! wins" can drop a shorter list that was the correct edit.

use crate::models::WorkoutRecord;
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Merge local and remote collections; soft-deleted records are excluded
pub fn merge_workouts(
    local: Vec<WorkoutRecord>,
    remote: Vec<WorkoutRecord>,
    now: DateTime<Utc>,
) -> Vec<WorkoutRecord> {
    let mut merged: Vec<WorkoutRecord> = Vec::with_capacity(remote.len() + local.len());
    let mut index: HashMap<String, usize> = HashMap::new();

    for mut record in remote {
        record.synced = true;
        match index.get(&record.id).copied() {
            Some(slot) => merged[slot] = record,
            None => {
                index.insert(record.id.clone(), merged.len());
                merged.push(record);
            }
        }
    }

    for local_record in local {
        match index.get(&local_record.id).copied() {
            None => {
                index.insert(local_record.id.clone(), merged.len());
                merged.push(local_record);
            }
            Some(slot) if !local_record.synced => {
                merged[slot] = resolve_conflict(local_record, &merged[slot], now);
            }
            Some(_) => {}
        }
    }

    merged.retain(WorkoutRecord::is_active);
    merged
}

/// Merge, then carry over local tombstones the merge did not replace.
///
/// A soft-deleted record stays in local storage until its remote delete is
/// confirmed, so a pull must neither resurrect nor forget it.
pub fn merge_preserving_tombstones(
    local: Vec<WorkoutRecord>,
    remote: Vec<WorkoutRecord>,
    now: DateTime<Utc>,
) -> Vec<WorkoutRecord> {
    let tombstones: Vec<WorkoutRecord> = local.iter().filter(|w| w.is_deleted).cloned().collect();
    let mut merged = merge_workouts(local, remote, now);

    let present: HashSet<String> = merged.iter().map(|w| w.id.clone()).collect();
    merged.extend(tombstones.into_iter().filter(|t| !present.contains(&t.id)));
    merged
}

/// Resolve an unsynced local record against its remote counterpart
pub fn resolve_conflict(local: WorkoutRecord, remote: &WorkoutRecord, now: DateTime<Utc>) -> WorkoutRecord {
    match local.updated_at.cmp(&remote.updated_at) {
        Ordering::Greater => WorkoutRecord { synced: false, ..local },
        Ordering::Less => WorkoutRecord {
            synced: true,
            ..remote.clone()
        },
        Ordering::Equal => {
            // local title and notes are taken as intentional edits
            let exercises = if local.exercises.len() >= remote.exercises.len() {
                local.exercises
            } else {
                remote.exercises.clone()
            };
            let cardio_sessions = if local.cardio_sessions.len() >= remote.cardio_sessions.len() {
                local.cardio_sessions
            } else {
                remote.cardio_sessions.clone()
            };

            WorkoutRecord {
                title: local.title,
                notes: local.notes,
                exercises,
                cardio_sessions,
                updated_at: now,
                synced: false,
                ..remote.clone()
            }
        }
    }
}
