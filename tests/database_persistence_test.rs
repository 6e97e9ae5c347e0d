// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Offline state must survive an app restart on the SQLite backend

mod common;

use anyhow::Result;
use common::Session;
use std::sync::Arc;
use tempfile::TempDir;
use workout_sync::database::Database;
use workout_sync::models::{DraftWorkout, NewWorkout, UserIdentity};
use workout_sync::remote::MemoryDocumentStore;
use workout_sync::storage::KeyValueStore;

async fn open(dir: &TempDir) -> Result<Arc<dyn KeyValueStore>> {
    let url = format!("sqlite:{}", dir.path().join("workouts.db").display());
    Ok(Arc::new(Database::new(&url).await?))
}

#[tokio::test]
async fn test_pending_work_survives_restart() -> Result<()> {
    let dir = TempDir::new()?;
    let remote = Arc::new(MemoryDocumentStore::new());
    remote.set_offline(true);

    let workout_id = {
        let session = Session::with_backend(UserIdentity::authenticated("user-1"), open(&dir).await?, remote.clone());
        let record = session
            .service
            .create_workout(NewWorkout::titled("Tempo Run", "2024-05-04"))
            .await?;
        session.service.save_draft(DraftWorkout::new("2024-05-05")).await?;
        record.id
    };

    let session = Session::with_backend(UserIdentity::authenticated("user-1"), open(&dir).await?, remote.clone());
    assert_eq!(session.service.ledger().list().await?, vec![workout_id.clone()]);
    assert!(session.service.get_draft().await?.is_some());

    session.set_online(true);
    let outcome = session.orchestrator.trigger_sync(false).await;
    assert!(outcome.report().is_some_and(|r| r.success));

    let reopened = Session::with_backend(UserIdentity::authenticated("user-1"), open(&dir).await?, remote);
    assert!(reopened.service.ledger().list().await?.is_empty());
    assert!(reopened
        .service
        .get_workout_by_id(&workout_id)
        .await?
        .is_some_and(|w| w.synced));
    assert!(!reopened.orchestrator.can_user_sync().await?.can_sync);
    Ok(())
}

#[tokio::test]
async fn test_memory_database_is_isolated_per_connection() -> Result<()> {
    let first = Database::new("sqlite::memory:").await?;
    let second = Database::new("sqlite::memory:").await?;

    first.set("pending_uploads", r#"["w1"]"#.to_string()).await?;

    assert!(first.get("pending_uploads").await?.is_some());
    assert!(second.get("pending_uploads").await?.is_none());
    Ok(())
}
