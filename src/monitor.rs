// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Background network monitor
//!
//! Polls the lenient probe on a fixed interval, keeps the orchestrator's
//! `is_online` flag current and proposes an auto-sync whenever the device
//! comes back online. On a second, slower interval it publishes a
//! [`SyncStatus`] snapshot that UI code can watch instead of polling.

use crate::config::SyncConfig;
use crate::sync::{SyncOrchestrator, SyncStatus};
use anyhow::{bail, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

#[derive(Clone)]
pub struct NetworkMonitor {
    interval: Duration,
    status_interval: Duration,
    running: Arc<AtomicBool>,
    task_handle: Arc<Mutex<Option<JoinHandle<()>>>>,
    status: Arc<watch::Sender<Option<SyncStatus>>>,
}

impl NetworkMonitor {
    pub fn new(interval: Duration, status_interval: Duration) -> Self {
        let (status, _) = watch::channel(None);
        Self {
            interval,
            status_interval,
            running: Arc::new(AtomicBool::new(false)),
            task_handle: Arc::new(Mutex::new(None)),
            status: Arc::new(status),
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.network_check_interval(), config.status_refresh_interval())
    }

    /// Latest published status; `None` until the first snapshot
    pub fn subscribe_status(&self) -> watch::Receiver<Option<SyncStatus>> {
        self.status.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn start(&self, orchestrator: Arc<SyncOrchestrator>) -> Result<()> {
        if self.interval.is_zero() || self.status_interval.is_zero() {
            bail!("Network monitor intervals must be greater than zero");
        }
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Network monitor already running");
            return Ok(());
        }

        let running = self.running.clone();
        let interval = self.interval;
        let status_interval = self.status_interval;
        let status = self.status.clone();
        let handle = tokio::spawn(async move {
            Self::monitor_loop(running, interval, status_interval, status, orchestrator).await;
        });
        *self.task_handle.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);

        info!(
            monitor.interval_ms = interval.as_millis() as u64,
            monitor.status_interval_ms = status_interval.as_millis() as u64,
            "Network monitor started"
        );
        Ok(())
    }

    pub fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(handle) = self
            .task_handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
        info!("Network monitor stopped");
    }

    async fn monitor_loop(
        running: Arc<AtomicBool>,
        interval: Duration,
        status_interval: Duration,
        status: Arc<watch::Sender<Option<SyncStatus>>>,
        orchestrator: Arc<SyncOrchestrator>,
    ) {
        let mut network_ticker = tokio::time::interval(interval);
        network_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut status_ticker = tokio::time::interval(status_interval);
        status_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        while running.load(Ordering::SeqCst) {
            tokio::select! {
                _ = network_ticker.tick() => {
                    let online = orchestrator.probe().is_available().await;
                    if orchestrator.record_network_status(online) {
                        Self::publish_status(&orchestrator, &status).await;
                        if online {
                            // the debounce must not delay the next poll
                            let orchestrator = orchestrator.clone();
                            tokio::spawn(async move {
                                if let Some(outcome) = orchestrator.propose_auto_sync().await {
                                    debug!(?outcome, "Automatic sync finished");
                                }
                            });
                        }
                    }
                }
                _ = status_ticker.tick() => {
                    Self::publish_status(&orchestrator, &status).await;
                }
            }
        }
    }

    async fn publish_status(orchestrator: &SyncOrchestrator, status: &watch::Sender<Option<SyncStatus>>) {
        match orchestrator.get_status().await {
            Ok(snapshot) => {
                status.send_replace(Some(snapshot));
            }
            Err(e) => debug!("Status snapshot failed: {}", e),
        }
    }
}
