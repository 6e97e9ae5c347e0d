// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Connectivity diagnostics
//!
//! Answers "why is nothing syncing?" with one report: direct HTTP probes,
//! a bounded read of the remote store, the session identity and the state
//! of the local store.

use crate::constants::service;
use crate::network::NetworkProbe;
use crate::service::WorkoutService;
use crate::sync::SyncOrchestrator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Overall health status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub version: String,
    pub environment: String,
}

/// Result of a single check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub name: String,
    pub status: HealthStatus,
    pub message: String,
    /// Check duration in milliseconds
    pub duration_ms: u64,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticsReport {
    pub status: HealthStatus,
    pub service: ServiceInfo,
    pub checks: Vec<ComponentHealth>,
    pub timestamp: DateTime<Utc>,
    pub response_time_ms: u64,
}

impl DiagnosticsReport {
    pub fn check(&self, name: &str) -> Option<&ComponentHealth> {
        self.checks.iter().find(|c| c.name == name)
    }
}

pub struct ConnectivityDiagnostics {
    service: Arc<WorkoutService>,
    probe: Arc<dyn NetworkProbe>,
    remote_timeout: Duration,
}

impl ConnectivityDiagnostics {
    pub fn new(service: Arc<WorkoutService>, probe: Arc<dyn NetworkProbe>, remote_timeout: Duration) -> Self {
        Self {
            service,
            probe,
            remote_timeout,
        }
    }

    pub fn for_orchestrator(orchestrator: &SyncOrchestrator) -> Self {
        Self::new(
            orchestrator.service().clone(),
            orchestrator.probe(),
            orchestrator.config().network.strict_probe_timeout(),
        )
    }

    pub async fn run(&self) -> DiagnosticsReport {
        let start = Instant::now();
        info!("Running connectivity diagnostics");

        let checks = vec![
            self.check_http().await,
            self.check_remote_store().await,
            self.check_identity(),
            self.check_local_store().await,
        ];

        let status = if checks.iter().any(|c| c.status == HealthStatus::Unhealthy) {
            HealthStatus::Unhealthy
        } else if checks.iter().any(|c| c.status == HealthStatus::Degraded) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };

        DiagnosticsReport {
            status,
            service: ServiceInfo {
                name: service::SERVICE_NAME.to_string(),
                version: service::SERVICE_VERSION.to_string(),
                environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "unknown".to_string()),
            },
            checks,
            timestamp: Utc::now(),
            response_time_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn check_http(&self) -> ComponentHealth {
        let start = Instant::now();
        let reachable = self.probe.probe_endpoints().await;

        // a failed direct probe does not mean offline
        let (status, message) = if reachable {
            (HealthStatus::Healthy, "Probe endpoint reachable")
        } else {
            (HealthStatus::Degraded, "No probe endpoint answered")
        };

        ComponentHealth {
            name: "http".to_string(),
            status,
            message: message.to_string(),
            duration_ms: start.elapsed().as_millis() as u64,
            metadata: None,
        }
    }

    async fn check_remote_store(&self) -> ComponentHealth {
        let start = Instant::now();

        if self.service.identity().is_anonymous {
            return ComponentHealth {
                name: "remote_store".to_string(),
                status: HealthStatus::Healthy,
                message: "Skipped for guest session".to_string(),
                duration_ms: 0,
                metadata: None,
            };
        }

        match self.service.adapter().check_remote(self.remote_timeout).await {
            Ok(()) => ComponentHealth {
                name: "remote_store".to_string(),
                status: HealthStatus::Healthy,
                message: "Remote document store reachable".to_string(),
                duration_ms: start.elapsed().as_millis() as u64,
                metadata: None,
            },
            Err(e) => {
                warn!("Remote store check failed: {}", e);
                ComponentHealth {
                    name: "remote_store".to_string(),
                    status: HealthStatus::Unhealthy,
                    message: format!("Remote store check failed: {}", e),
                    duration_ms: start.elapsed().as_millis() as u64,
                    metadata: Some(serde_json::json!({ "transient": e.is_transient() })),
                }
            }
        }
    }

    fn check_identity(&self) -> ComponentHealth {
        let identity = self.service.identity();
        let (status, message) = if identity.is_anonymous {
            (HealthStatus::Degraded, "Guest session, workouts stay on this device".to_string())
        } else {
            (HealthStatus::Healthy, format!("Signed in as {}", identity.user_id))
        };

        ComponentHealth {
            name: "identity".to_string(),
            status,
            message,
            duration_ms: 0,
            metadata: Some(serde_json::json!({ "anonymous": identity.is_anonymous })),
        }
    }

    async fn check_local_store(&self) -> ComponentHealth {
        let start = Instant::now();
        let store = self.service.store();

        let counts = async {
            let records = store.get_all().await?;
            let pending = self.service.ledger().list().await?;
            let last_sync = store.get_last_sync_time().await?;
            Ok::<_, crate::errors::SyncError>((records, pending, last_sync))
        }
        .await;

        match counts {
            Ok((records, pending, last_sync)) => ComponentHealth {
                name: "local_store".to_string(),
                status: HealthStatus::Healthy,
                message: format!("{} workouts stored, {} pending upload", records.len(), pending.len()),
                duration_ms: start.elapsed().as_millis() as u64,
                metadata: Some(serde_json::json!({
                    "records": records.len(),
                    "tombstones": records.iter().filter(|w| w.is_deleted).count(),
                    "pending": pending.len(),
                    "last_sync_time": last_sync,
                })),
            },
            Err(e) => ComponentHealth {
                name: "local_store".to_string(),
                status: HealthStatus::Unhealthy,
                message: format!("Local store check failed: {}", e),
                duration_ms: start.elapsed().as_millis() as u64,
                metadata: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::RemoteSyncAdapter;
    use crate::config::RetryConfig;
    use crate::ledger::PendingLedger;
    use crate::models::UserIdentity;
    use crate::remote::MemoryDocumentStore;
    use crate::storage::{KeyValueStore, MemoryKeyValueStore};
    use crate::store::LocalStore;
    use async_trait::async_trait;

    struct Unreachable;

    #[async_trait]
    impl NetworkProbe for Unreachable {
        async fn probe_endpoints(&self) -> bool {
            false
        }

        async fn is_available(&self) -> bool {
            true
        }
    }

    fn diagnostics(identity: UserIdentity, remote_online: bool) -> ConnectivityDiagnostics {
        let kv: Arc<dyn KeyValueStore> = Arc::new(MemoryKeyValueStore::new());
        let remote = Arc::new(MemoryDocumentStore::new());
        remote.set_offline(!remote_online);
        let store = LocalStore::new(kv.clone());
        let adapter = RemoteSyncAdapter::new(remote, store.clone(), Duration::from_secs(1));
        let service = Arc::new(WorkoutService::new(
            identity,
            store,
            PendingLedger::new(kv),
            adapter,
            RetryConfig::immediate(1),
        ));
        ConnectivityDiagnostics::new(service, Arc::new(Unreachable), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_probe_failure_with_reachable_remote_is_degraded() {
        let report = diagnostics(UserIdentity::authenticated("u1"), true).run().await;

        assert_eq!(report.status, HealthStatus::Degraded);
        assert_eq!(report.check("http").unwrap().status, HealthStatus::Degraded);
        assert_eq!(report.check("remote_store").unwrap().status, HealthStatus::Healthy);
        assert_eq!(report.service.name, "workout-sync");
    }

    #[tokio::test]
    async fn test_unreachable_remote_is_unhealthy() {
        let report = diagnostics(UserIdentity::authenticated("u1"), false).run().await;

        assert_eq!(report.status, HealthStatus::Unhealthy);
        let remote = report.check("remote_store").unwrap();
        assert_eq!(remote.metadata.as_ref().unwrap()["transient"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn test_guest_skips_remote_check() {
        let report = diagnostics(UserIdentity::anonymous("guest"), false).run().await;

        assert_eq!(report.check("remote_store").unwrap().status, HealthStatus::Healthy);
        assert_eq!(report.check("identity").unwrap().status, HealthStatus::Degraded);
        assert_eq!(report.check("local_store").unwrap().status, HealthStatus::Healthy);
    }
}
