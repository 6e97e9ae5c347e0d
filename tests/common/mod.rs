// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use workout_sync::adapter::RemoteSyncAdapter;
use workout_sync::config::{RetryConfig, SyncConfig};
use workout_sync::ledger::PendingLedger;
use workout_sync::models::UserIdentity;
use workout_sync::network::NetworkProbe;
use workout_sync::remote::MemoryDocumentStore;
use workout_sync::service::WorkoutService;
use workout_sync::storage::{KeyValueStore, MemoryKeyValueStore};
use workout_sync::store::LocalStore;
use workout_sync::sync::SyncOrchestrator;

/// Probe with a switch and a call counter
pub struct CountingProbe {
    online: AtomicBool,
    calls: AtomicUsize,
}

impl CountingProbe {
    pub fn new(online: bool) -> Self {
        Self {
            online: AtomicBool::new(online),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NetworkProbe for CountingProbe {
    async fn probe_endpoints(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.online.load(Ordering::SeqCst)
    }

    async fn is_available(&self) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        // lenient probe never reports offline
        true
    }
}

/// One user session wired against in-memory stores
pub struct Session {
    pub kv: Arc<dyn KeyValueStore>,
    pub remote: Arc<MemoryDocumentStore>,
    pub probe: Arc<CountingProbe>,
    pub service: Arc<WorkoutService>,
    pub orchestrator: SyncOrchestrator,
}

impl Session {
    pub fn new(identity: UserIdentity) -> Self {
        Self::with_backend(identity, Arc::new(MemoryKeyValueStore::new()), Arc::new(MemoryDocumentStore::new()))
    }

    pub fn with_backend(
        identity: UserIdentity,
        kv: Arc<dyn KeyValueStore>,
        remote: Arc<MemoryDocumentStore>,
    ) -> Self {
        let store = LocalStore::new(kv.clone());
        let adapter = RemoteSyncAdapter::new(remote.clone(), store.clone(), Duration::from_secs(5));
        let service = Arc::new(WorkoutService::new(
            identity,
            store,
            PendingLedger::new(kv.clone()),
            adapter,
            RetryConfig::immediate(3),
        ));

        let probe = Arc::new(CountingProbe::new(true));
        let mut config = SyncConfig::default();
        config.sync.auto_sync_debounce_ms = 0;
        config.network.strict_probe_timeout_ms = 500;
        let orchestrator = SyncOrchestrator::new(service.clone(), probe.clone(), config);

        Self {
            kv,
            remote,
            probe,
            service,
            orchestrator,
        }
    }

    /// Take both the probe and the remote store offline or online
    pub fn set_online(&self, online: bool) {
        self.remote.set_offline(!online);
        self.probe.set_online(online);
    }
}
