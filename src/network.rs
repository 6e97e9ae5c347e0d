// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Network Probe
//!
//! Best-effort connectivity detection. A handful of lightweight `HEAD`
//! requests are sent to well-known endpoints, each bounded by a short
//! timeout; the first endpoint that answers with a success status settles
//! the question.
//!
//! When every direct probe fails the lenient check still reports "online":
//! on mobile networks false negatives would suppress sync entirely, while a
//! false positive only costs one wasted sync attempt. The stricter check
//! that gates an actual sync cycle lives in the orchestrator and races a
//! remote document read against a timeout.

use crate::config::SyncConfig;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

#[async_trait]
pub trait NetworkProbe: Send + Sync {
    /// True as soon as any direct endpoint answers; no fallback
    async fn probe_endpoints(&self) -> bool;

    /// Lenient availability used for status display
    async fn is_available(&self) -> bool;
}

pub struct HttpNetworkProbe {
    client: Client,
    endpoints: Vec<String>,
    timeout: Duration,
    assume_online_fallback: bool,
}

impl HttpNetworkProbe {
    pub fn new(endpoints: Vec<String>, timeout: Duration) -> Self {
        Self {
            client: Client::new(),
            endpoints,
            timeout,
            assume_online_fallback: true,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self {
            assume_online_fallback: config.network.assume_online_fallback,
            ..Self::new(config.network.probe_endpoints.clone(), config.network.probe_timeout())
        }
    }

    /// Disable the "assume online" fallback
    pub fn strict(mut self) -> Self {
        self.assume_online_fallback = false;
        self
    }

    async fn probe(&self, endpoint: &str) -> bool {
        let request = self
            .client
            .head(endpoint)
            .header("Cache-Control", "no-cache")
            .timeout(self.timeout);

        match request.send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                debug!(probe.endpoint = %endpoint, probe.status = response.status().as_u16(), "Probe answered without success");
                false
            }
            Err(e) => {
                debug!(probe.endpoint = %endpoint, "Probe failed: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl NetworkProbe for HttpNetworkProbe {
    async fn probe_endpoints(&self) -> bool {
        for endpoint in &self.endpoints {
            if self.probe(endpoint).await {
                return true;
            }
        }
        false
    }

    async fn is_available(&self) -> bool {
        if self.probe_endpoints().await {
            return true;
        }
        if self.assume_online_fallback {
            info!("Direct network probes failed, assuming online");
            return true;
        }
        false
    }
}
