// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Workout Sync
//!
//! An offline-first synchronization engine for a mobile fitness tracker.
//! Workouts are always written to a durable local store first; a background
//! cycle pushes pending changes to a remote document store, pulls remote
//! state and merges it back.
//!
//! ## Features
//!
//! - **Offline first**: writes never fail because of the network
//! - **Pending ledger**: failed pushes are remembered and retried by the next cycle
//! - **Rate-limited sync**: one user-initiated cycle per cooldown window
//! - **Guest sessions**: local-only, never touch the remote store
//! - **Heuristic merge**: last-writer-wins with a field-level tie breaker
//!
//! ## Architecture
//!
//! - **Store / Ledger**: durable collections behind a [`storage::KeyValueStore`]
//! - **Adapter**: single-document push, pull, delete against a [`remote::RemoteDocumentStore`]
//! - **Merge**: reconciles pulled remote state with local edits
//! - **Service**: the operations the UI calls
//! - **Sync**: the orchestrator state machine, status and auto-trigger hooks
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use workout_sync::adapter::RemoteSyncAdapter;
//! use workout_sync::config::SyncConfig;
//! use workout_sync::database::Database;
//! use workout_sync::ledger::PendingLedger;
//! use workout_sync::models::{NewWorkout, UserIdentity};
//! use workout_sync::monitor::NetworkMonitor;
//! use workout_sync::network::HttpNetworkProbe;
//! use workout_sync::remote::HttpDocumentStore;
//! use workout_sync::service::WorkoutService;
//! use workout_sync::storage::KeyValueStore;
//! use workout_sync::store::LocalStore;
//! use workout_sync::sync::SyncOrchestrator;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SyncConfig::load(None)?;
//!     workout_sync::logging::init_from_env(&config)?;
//!
//!     let kv: Arc<dyn KeyValueStore> = Arc::new(Database::new(&config.storage.database_url).await?);
//!     let store = LocalStore::new(kv.clone());
//!     let remote = Arc::new(HttpDocumentStore::from_config(&config.remote)?);
//!     let adapter = RemoteSyncAdapter::new(remote, store.clone(), config.remote.timeout());
//!
//!     let service = Arc::new(WorkoutService::new(
//!         UserIdentity::authenticated("user-1"),
//!         store,
//!         PendingLedger::new(kv),
//!         adapter,
//!         config.retry.clone(),
//!     ));
//!     service.create_workout(NewWorkout::titled("Leg Day", "2024-05-01")).await?;
//!
//!     let probe = Arc::new(HttpNetworkProbe::from_config(&config));
//!     let monitor = NetworkMonitor::from_config(&config);
//!     let orchestrator = Arc::new(SyncOrchestrator::new(service, probe, config));
//!     monitor.start(orchestrator.clone())?;
//!
//!     println!("{:?}", orchestrator.trigger_sync(false).await);
//!     monitor.stop();
//!     Ok(())
//! }
//! ```

/// Workout, exercise and draft data models
pub mod models;

/// Error taxonomy
pub mod errors;

/// Durable key-value storage contract
pub mod storage;

/// SQLite-backed key-value storage
pub mod database;

/// Local record store
pub mod store;

/// Pending upload ledger
pub mod ledger;

/// Connectivity probing
pub mod network;

/// Remote document store contract and implementations
pub mod remote;

/// Moves workout documents between the local and remote stores
pub mod adapter;

/// Merge of local and remote collections
pub mod merge;

/// Built-in exercise catalog
pub mod catalog;

/// Default workout titles
pub mod title;

/// UI-facing workout operations
pub mod service;

/// Sync orchestrator
pub mod sync;

/// Background network monitor
pub mod monitor;

/// Connectivity diagnostics
pub mod health;

/// Configuration management and persistence
pub mod config;

/// Application constants and configuration values
pub mod constants;

/// Production logging and structured output
pub mod logging;
