// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Sync Orchestrator
//!
//! Rate-limited, user-triggerable coordinator of a sync cycle. One
//! orchestrator exists per user session.
//!
//! ```text
//! Idle -> CheckingPermission -> [denied] Idle
//!                            -> CheckingNetwork -> [offline] Idle
//!                                               -> CleaningLedger -> DrainingPending
//!                                                  -> Reconciling -> SyncingExercises
//!                                                  -> UpdatingTimestamp -> Idle
//! ```
//!
//! Phases run strictly in sequence. A failure inside a phase becomes an
//! error string on the report; it never aborts the remaining records. Every
//! attempt that gets past the network gate stamps the last sync time, so the
//! cooldown applies after partial failures too.

use crate::config::SyncConfig;
use crate::constants::messages;
use crate::errors::SyncResult;
use crate::logging::SyncLogger;
use crate::network::NetworkProbe;
use crate::service::{PendingCount, WorkoutService};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    Idle,
    CheckingPermission,
    CheckingNetwork,
    CleaningLedger,
    DrainingPending,
    Reconciling,
    SyncingExercises,
    UpdatingTimestamp,
}

/// Read-only snapshot for the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_online: bool,
    pub is_syncing: bool,
    pub last_sync_time: Option<DateTime<Utc>>,
    pub pending_count: PendingCount,
    pub sync_errors: Vec<String>,
    pub has_pending_sync: bool,
    pub phase: SyncPhase,
}

impl SyncStatus {
    pub fn total_pending(&self) -> usize {
        self.pending_count.total()
    }

    /// Relative label such as "5m ago"
    pub fn format_last_sync(&self, now: DateTime<Utc>) -> String {
        let Some(last) = self.last_sync_time else {
            return "Never synced".to_string();
        };
        let elapsed = now.signed_duration_since(last);
        if elapsed.num_minutes() < 1 {
            "Just now".to_string()
        } else if elapsed.num_hours() < 1 {
            format!("{}m ago", elapsed.num_minutes())
        } else if elapsed.num_days() < 1 {
            format!("{}h ago", elapsed.num_hours())
        } else {
            format!("{}d ago", elapsed.num_days())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncPermission {
    pub can_sync: bool,
    pub reason: Option<String>,
    /// End of the cooldown window, when rate limited
    pub next_sync_time: Option<DateTime<Utc>>,
}

impl SyncPermission {
    fn granted() -> Self {
        Self {
            can_sync: true,
            reason: None,
            next_sync_time: None,
        }
    }

    fn denied(reason: impl Into<String>, next_sync_time: Option<DateTime<Utc>>) -> Self {
        Self {
            can_sync: false,
            reason: Some(reason.into()),
            next_sync_time,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub success: bool,
    pub synced_count: usize,
    pub errors: Vec<String>,
}

impl SyncReport {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            synced_count: 0,
            errors: vec![error.into()],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// Guest session or cooldown window still open
    Denied(SyncPermission),
    /// Another cycle is in flight; nothing was done
    AlreadySyncing,
    Finished(SyncReport),
}

impl TriggerOutcome {
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            Self::Finished(report) => Some(report),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct SessionState {
    is_online: bool,
    phase: SyncPhase,
    sync_errors: Vec<String>,
}

/// Flips the syncing flag back when a cycle ends, however it ends
struct SyncingGuard<'a> {
    orchestrator: &'a SyncOrchestrator,
}

impl Drop for SyncingGuard<'_> {
    fn drop(&mut self) {
        self.orchestrator.state().phase = SyncPhase::Idle;
        self.orchestrator.is_syncing.store(false, Ordering::SeqCst);
    }
}

pub struct SyncOrchestrator {
    service: Arc<WorkoutService>,
    probe: Arc<dyn NetworkProbe>,
    config: SyncConfig,
    state: Mutex<SessionState>,
    is_syncing: AtomicBool,
    auto_sync_generation: AtomicU64,
}

impl SyncOrchestrator {
    pub fn new(service: Arc<WorkoutService>, probe: Arc<dyn NetworkProbe>, config: SyncConfig) -> Self {
        Self {
            service,
            probe,
            config,
            state: Mutex::new(SessionState {
                is_online: false,
                phase: SyncPhase::Idle,
                sync_errors: Vec::new(),
            }),
            is_syncing: AtomicBool::new(false),
            auto_sync_generation: AtomicU64::new(0),
        }
    }

    pub fn service(&self) -> &Arc<WorkoutService> {
        &self.service
    }

    pub fn probe(&self) -> Arc<dyn NetworkProbe> {
        self.probe.clone()
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: SyncPhase) {
        debug!(sync.phase = ?phase, "Sync phase");
        self.state().phase = phase;
    }

    pub fn is_online(&self) -> bool {
        self.state().is_online
    }

    pub fn is_syncing(&self) -> bool {
        self.is_syncing.load(Ordering::SeqCst)
    }

    pub async fn get_status(&self) -> SyncResult<SyncStatus> {
        let pending_count = self.service.get_pending_sync_count().await?;
        let last_sync_time = self.service.store().get_last_sync_time().await?;
        let state = self.state();

        Ok(SyncStatus {
            is_online: state.is_online,
            is_syncing: self.is_syncing(),
            last_sync_time,
            pending_count,
            sync_errors: state.sync_errors.clone(),
            has_pending_sync: pending_count.total() > 0,
            phase: state.phase,
        })
    }

    pub fn clear_sync_errors(&self) {
        self.state().sync_errors.clear();
    }

    /// Guest and cooldown checks, without side effects
    pub async fn can_user_sync(&self) -> SyncResult<SyncPermission> {
        if self.service.identity().is_anonymous {
            return Ok(SyncPermission::denied(messages::ANONYMOUS_SYNC_DENIED, None));
        }

        let Some(last_sync) = self.service.store().get_last_sync_time().await? else {
            return Ok(SyncPermission::granted());
        };

        let next_sync_time = last_sync + self.config.cooldown();
        let remaining = next_sync_time.signed_duration_since(Utc::now());
        if remaining <= chrono::Duration::zero() {
            return Ok(SyncPermission::granted());
        }

        let hours = ((remaining.num_seconds() + 3599) / 3600).max(1);
        let reason = format!(
            "You can sync again in {} hour{}. This helps protect our servers from overuse.",
            hours,
            if hours == 1 { "" } else { "s" }
        );
        Ok(SyncPermission::denied(reason, Some(next_sync_time)))
    }

    /// Run one sync cycle. `force` skips the cooldown; guests are refused
    /// regardless.
    pub async fn trigger_sync(&self, force: bool) -> TriggerOutcome {
        let span = info_span!("sync_cycle", sync.id = %Uuid::new_v4(), sync.forced = force);
        self.run_trigger(force).instrument(span).await
    }

    async fn run_trigger(&self, force: bool) -> TriggerOutcome {
        if self
            .is_syncing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("Sync already in progress, ignoring trigger");
            return TriggerOutcome::AlreadySyncing;
        }
        let _guard = SyncingGuard { orchestrator: self };
        self.state().sync_errors.clear();

        self.set_phase(SyncPhase::CheckingPermission);
        let permission = if force && !self.service.identity().is_anonymous {
            SyncPermission::granted()
        } else {
            match self.can_user_sync().await {
                Ok(permission) => permission,
                Err(e) => return self.finish_with(SyncReport::failed(format!("Sync failed: {e}"))),
            }
        };
        if !permission.can_sync {
            let reason = permission
                .reason
                .clone()
                .unwrap_or_else(|| messages::SYNC_NOT_ALLOWED.to_string());
            SyncLogger::log_permission_refusal(&self.service.identity().user_id, &reason);
            self.state().sync_errors = vec![reason];
            return TriggerOutcome::Denied(permission);
        }

        self.set_phase(SyncPhase::CheckingNetwork);
        let online = self.check_network().await;
        self.record_network_status(online);
        if !online {
            warn!("Sync skipped, no network");
            return self.finish_with(SyncReport::failed(messages::NO_NETWORK));
        }

        let started = Instant::now();
        let mut report = SyncReport::default();
        if let Err(e) = self.run_phases(&mut report).await {
            report.errors.push(format!("Sync failed: {e}"));
        }

        self.set_phase(SyncPhase::UpdatingTimestamp);
        if let Err(e) = self.service.store().set_last_sync_time(Utc::now()).await {
            report.errors.push(format!("Sync failed: {e}"));
        }

        report.success = report.errors.is_empty();
        SyncLogger::log_sync_outcome(
            &self.service.identity().user_id,
            report.synced_count,
            report.errors.len(),
            started.elapsed().as_millis() as u64,
        );
        self.finish_with(report)
    }

    fn finish_with(&self, report: SyncReport) -> TriggerOutcome {
        self.state().sync_errors = report.errors.clone();
        TriggerOutcome::Finished(report)
    }

    /// Direct probes first, then a bounded read of the remote store
    async fn check_network(&self) -> bool {
        if self.probe.probe_endpoints().await {
            return true;
        }
        match self
            .service
            .adapter()
            .check_remote(self.config.network.strict_probe_timeout())
            .await
        {
            Ok(()) => true,
            Err(e) => {
                debug!("Remote store unreachable: {}", e);
                false
            }
        }
    }

    async fn run_phases(&self, report: &mut SyncReport) -> SyncResult<()> {
        let store = self.service.store();
        let ledger = self.service.ledger();
        let adapter = self.service.adapter();

        self.set_phase(SyncPhase::CleaningLedger);
        let dropped = ledger.cleanup(store).await?;
        if !dropped.is_empty() {
            debug!(ledger.dropped = dropped.len(), "Dropped stale ledger entries");
        }
        for tombstone in store.get_tombstones().await? {
            match adapter.delete(&tombstone.id).await {
                Ok(()) => {
                    store.remove(&tombstone.id).await?;
                    ledger.remove(&tombstone.id).await?;
                    info!(workout.id = %tombstone.id, "Deleted workout purged");
                }
                Err(e) => report
                    .errors
                    .push(format!("Failed to delete workout {}: {}", tombstone.id, e)),
            }
        }

        self.set_phase(SyncPhase::DrainingPending);
        for id in ledger.list().await? {
            let Some(record) = store.get_by_id(&id).await? else {
                ledger.remove(&id).await?;
                continue;
            };
            match adapter.push(&record).await {
                Ok(()) => {
                    report.synced_count += 1;
                    let synced = store.get_by_id(&id).await?.is_some_and(|w| w.synced);
                    if synced {
                        ledger.remove(&id).await?;
                    }
                }
                Err(e) => report.errors.push(format!("Failed to sync workout {id}: {e}")),
            }
        }

        self.set_phase(SyncPhase::Reconciling);
        match adapter.reconcile(&self.service.identity().user_id, ledger).await {
            Ok(summary) => debug!(
                sync.pulled = summary.pulled,
                sync.requeued = summary.requeued,
                "Remote state merged"
            ),
            Err(e) => report.errors.push(format!("Failed to pull remote workouts: {e}")),
        }

        self.set_phase(SyncPhase::SyncingExercises);
        report.errors.extend(self.service.sync_pending_exercises().await?);
        Ok(())
    }

    /// Mark every record unsynced, queue it and run a forced cycle
    pub async fn force_resync(&self) -> TriggerOutcome {
        if self.service.identity().is_anonymous {
            return TriggerOutcome::Denied(SyncPermission::denied(messages::ANONYMOUS_SYNC_DENIED, None));
        }
        if let Err(e) = self.requeue_everything().await {
            return self.finish_with(SyncReport::failed(format!("Sync failed: {e}")));
        }
        self.trigger_sync(true).await
    }

    async fn requeue_everything(&self) -> SyncResult<()> {
        let ids = self.service.store().mark_all_unsynced().await?;
        for id in &ids {
            self.service.ledger().add(id).await?;
        }
        info!(sync.requeued = ids.len(), "All workouts queued for resync");
        Ok(())
    }

    // ========================================================================
    // Connectivity and auto-trigger hooks
    // ========================================================================

    /// Store the connectivity flag; returns true on a transition
    pub fn record_network_status(&self, online: bool) -> bool {
        let was_online = std::mem::replace(&mut self.state().is_online, online);
        if was_online != online {
            SyncLogger::log_connectivity_transition(was_online, online);
            return true;
        }
        false
    }

    /// Lenient probe for the status indicator
    pub async fn refresh_network_status(&self) -> bool {
        let online = self.probe.is_available().await;
        self.record_network_status(online);
        online
    }

    /// Debounced auto-sync. Runs only when work is pending and the user is
    /// permitted; a newer proposal supersedes one still waiting.
    pub async fn propose_auto_sync(&self) -> Option<TriggerOutcome> {
        let generation = self.auto_sync_generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.config.auto_sync_debounce()).await;
        if self.auto_sync_generation.load(Ordering::SeqCst) != generation || self.is_syncing() {
            return None;
        }

        let pending = match self.service.get_pending_sync_count().await {
            Ok(count) => count,
            Err(e) => {
                warn!("Auto-sync skipped: {}", e);
                return None;
            }
        };
        if pending.total() == 0 {
            return None;
        }

        match self.can_user_sync().await {
            Ok(permission) if permission.can_sync => {
                info!(sync.pending = pending.total(), "Starting automatic sync");
                Some(self.trigger_sync(false).await)
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Auto-sync skipped: {}", e);
                None
            }
        }
    }

    pub async fn on_app_foreground(&self) -> Option<TriggerOutcome> {
        self.propose_auto_sync().await
    }

    /// Proposes an auto-sync on an offline to online transition
    pub async fn on_network_change(&self, online: bool) -> Option<TriggerOutcome> {
        if self.record_network_status(online) && online {
            return self.propose_auto_sync().await;
        }
        None
    }
}
