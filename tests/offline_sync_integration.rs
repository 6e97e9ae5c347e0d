// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Offline-first workflows through the public API
//!
//! Each test drives a full session (service, ledger, adapter, orchestrator)
//! against in-memory stores whose connectivity can be switched off.

mod common;

use anyhow::Result;
use common::Session;
use workout_sync::adapter::RemoteSyncAdapter;
use workout_sync::constants::collections;
use workout_sync::models::{ExerciseEntry, NewWorkout, SetEntry, UserIdentity, WorkoutRecord, WorkoutUpdate};
use workout_sync::sync::TriggerOutcome;

fn leg_day() -> NewWorkout {
    let mut workout = NewWorkout::titled("Leg Day", "2024-05-01");
    workout.exercises = vec![
        ExerciseEntry::new("exercise_0_squat", "Squat", 0).with_sets(vec![
            SetEntry::weighted(5, 100.0),
            SetEntry::weighted(5, 100.0),
            SetEntry::weighted(5, 100.0),
        ]),
        ExerciseEntry::new("exercise_10_walking_lunge", "Walking Lunge", 1).with_sets(vec![
            SetEntry::bodyweight(12),
            SetEntry::bodyweight(12),
            SetEntry::bodyweight(12),
        ]),
    ];
    workout
}

#[tokio::test]
async fn test_offline_mutations_are_durable_and_queued() -> Result<()> {
    let session = Session::new(UserIdentity::authenticated("user-1"));
    session.set_online(false);
    let service = &session.service;

    let kept = service.create_workout(NewWorkout::titled("Push", "2024-05-01")).await?;
    let removed = service.create_workout(NewWorkout::titled("Pull", "2024-05-02")).await?;
    let untouched = service.create_workout(NewWorkout::titled("Legs", "2024-05-03")).await?;

    service
        .update_workout(
            &kept.id,
            WorkoutUpdate {
                title: Some("Push Day".to_string()),
                ..WorkoutUpdate::default()
            },
        )
        .await?;
    service.delete_workout(&removed.id).await?;

    let workouts = service.get_workouts().await?;
    let titles: Vec<&str> = workouts.iter().map(|w| w.title.as_str()).collect();
    assert_eq!(titles, vec!["Push Day", "Legs"]);
    assert!(workouts.iter().all(|w| !w.synced));

    let pending = service.ledger().list().await?;
    assert_eq!(pending, vec![kept.id.clone(), untouched.id.clone()]);

    let tombstones = service.store().get_tombstones().await?;
    assert_eq!(tombstones.len(), 1);
    assert_eq!(tombstones[0].id, removed.id);

    assert!(session.remote.snapshot(collections::WORKOUTS).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_leg_day_created_offline_syncs_when_forced() -> Result<()> {
    let session = Session::new(UserIdentity::authenticated("user-1"));
    session.set_online(false);

    let created = session.service.create_workout(leg_day()).await?;
    assert_eq!(created.total_sets(), 6);

    let workouts = session.service.get_workouts().await?;
    assert_eq!(workouts.len(), 1);
    assert!(!workouts[0].synced);
    assert_eq!(session.service.get_pending_sync_count().await?.workouts, 1);

    session.set_online(true);
    let outcome = session.orchestrator.trigger_sync(true).await;
    let report = outcome.report().expect("sync should run");
    assert!(report.success, "errors: {:?}", report.errors);
    assert_eq!(report.synced_count, 1);

    assert_eq!(session.service.get_pending_sync_count().await?.workouts, 0);
    let synced = session.service.get_workout_by_id(&created.id).await?.expect("workout kept");
    assert!(synced.synced);
    assert_eq!(synced.total_sets(), 6);

    let documents = session.remote.snapshot(collections::WORKOUTS).await;
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].data["title"], "Leg Day");
    Ok(())
}

#[tokio::test]
async fn test_guest_sync_is_refused_without_network_calls() -> Result<()> {
    let session = Session::new(UserIdentity::anonymous("guest-1"));
    session.service.create_workout(leg_day()).await?;

    let TriggerOutcome::Denied(permission) = session.orchestrator.trigger_sync(false).await else {
        panic!("guest sync must be refused");
    };
    assert!(!permission.can_sync);
    assert!(permission.reason.as_deref().unwrap_or_default().contains("Anonymous"));

    assert!(matches!(session.orchestrator.force_resync().await, TriggerOutcome::Denied(_)));
    assert_eq!(session.probe.calls(), 0);
    assert_eq!(session.remote.request_count(), 0);
    assert_eq!(session.service.get_pending_sync_count().await?.total(), 0);
    Ok(())
}

#[tokio::test]
async fn test_rate_limit_holds_after_partial_failure() -> Result<()> {
    let session = Session::new(UserIdentity::authenticated("user-1"));

    let broken = WorkoutRecord::create("user-1", NewWorkout::titled("  ", "2024-05-01"));
    session.service.store().put(broken.clone()).await?;
    session.service.ledger().add(&broken.id).await?;

    let first = session.orchestrator.trigger_sync(false).await;
    let report = first.report().expect("first sync should run");
    assert!(!report.success);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("missing required fields"));

    let permission = match session.orchestrator.trigger_sync(false).await {
        TriggerOutcome::Denied(permission) => permission,
        other => panic!("sync inside the cooldown must be refused, got {other:?}"),
    };
    assert!(permission.reason.as_deref().unwrap_or_default().contains("hours"));

    let status = session.orchestrator.get_status().await?;
    assert!(status.last_sync_time.is_some());
    assert!(status.has_pending_sync);
    assert_eq!(status.sync_errors.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_ledger_heals_after_hard_delete() -> Result<()> {
    let session = Session::new(UserIdentity::authenticated("user-1"));
    session.set_online(false);
    let record = session.service.create_workout(NewWorkout::titled("Arms", "2024-05-01")).await?;
    assert!(session.service.ledger().contains(&record.id).await?);

    session.service.store().remove(&record.id).await?;
    let dropped = session.service.ledger().cleanup(session.service.store()).await?;

    assert_eq!(dropped, vec![record.id]);
    assert!(session.service.ledger().list().await?.is_empty());
    assert_eq!(session.service.get_pending_sync_count().await?.total(), 0);
    Ok(())
}

#[tokio::test]
async fn test_repeated_push_is_idempotent() -> Result<()> {
    let session = Session::new(UserIdentity::authenticated("user-1"));
    let record = WorkoutRecord::create("user-1", leg_day());
    session.service.store().put(record.clone()).await?;

    session.service.adapter().push(&record).await?;
    let first = session.remote.snapshot(collections::WORKOUTS).await;
    session.service.adapter().push(&record).await?;
    let second = session.remote.snapshot(collections::WORKOUTS).await;

    assert_eq!(first, second);
    assert_eq!(second.len(), 1);
    session.service.ledger().add(&record.id).await?;
    session.service.ledger().add(&record.id).await?;
    assert_eq!(session.service.ledger().list().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_clock_collision_keeps_local_title() -> Result<()> {
    let session = Session::new(UserIdentity::authenticated("user-1"));

    let local = WorkoutRecord::create("user-1", NewWorkout::titled("Local title", "2024-05-01"));
    session.service.store().put(local.clone()).await?;

    let remote = WorkoutRecord {
        title: "Remote title".to_string(),
        ..local.clone()
    };
    session
        .remote
        .insert(collections::WORKOUTS, &remote.id, RemoteSyncAdapter::to_document(&remote)?)
        .await;

    let workouts = session.service.get_workouts().await?;

    assert_eq!(workouts.len(), 1);
    assert_eq!(workouts[0].title, "Local title");
    assert!(!workouts[0].synced);
    assert!(workouts[0].updated_at >= local.updated_at);
    assert!(session.service.ledger().contains(&local.id).await?);
    Ok(())
}

#[tokio::test]
async fn test_remote_records_are_pulled_into_a_fresh_device() -> Result<()> {
    let first_device = Session::new(UserIdentity::authenticated("user-1"));
    first_device.service.create_workout(leg_day()).await?;
    first_device.service.create_workout(NewWorkout::titled("Pull", "2024-05-02")).await?;

    let second_device = Session::with_backend(
        UserIdentity::authenticated("user-1"),
        std::sync::Arc::new(workout_sync::storage::MemoryKeyValueStore::new()),
        first_device.remote.clone(),
    );
    let workouts = second_device.service.get_workouts().await?;

    assert_eq!(workouts.len(), 2);
    assert!(workouts.iter().all(|w| w.synced));
    assert_eq!(second_device.service.get_pending_sync_count().await?.total(), 0);
    Ok(())
}
