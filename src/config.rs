// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Configuration management for the sync engine

pub mod environment;

use crate::constants::defaults;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    pub sync: SyncPolicyConfig,
    pub retry: RetryConfig,
    pub network: NetworkConfig,
    pub remote: RemoteConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncPolicyConfig {
    /// Minimum hours between two permission-checked syncs
    pub cooldown_hours: u64,
    /// Delay before an auto-triggered sync starts
    pub auto_sync_debounce_ms: u64,
    /// Polling interval of the background network monitor
    pub network_check_interval_secs: u64,
    /// How often the monitor publishes a status snapshot
    pub status_refresh_interval_secs: u64,
}

impl Default for SyncPolicyConfig {
    fn default() -> Self {
        Self {
            cooldown_hours: defaults::SYNC_COOLDOWN_HOURS,
            auto_sync_debounce_ms: defaults::AUTO_SYNC_DEBOUNCE_MS,
            network_check_interval_secs: defaults::NETWORK_CHECK_INTERVAL_SECS,
            status_refresh_interval_secs: defaults::STATUS_REFRESH_INTERVAL_SECS,
        }
    }
}

/// Bounded retry with exponential backoff for mutating pushes
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: defaults::RETRY_MAX_ATTEMPTS,
            base_delay_ms: defaults::RETRY_BASE_DELAY_MS,
        }
    }
}

impl RetryConfig {
    /// No waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay_ms: 0,
        }
    }

    /// Delay after the given failed attempt (1-based): base, 2x base, 4x base, ...
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
        Duration::from_millis(self.base_delay_ms.saturating_mul(factor))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub probe_endpoints: Vec<String>,
    pub probe_timeout_ms: u64,
    pub strict_probe_timeout_ms: u64,
    pub assume_online_fallback: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            probe_endpoints: defaults::PROBE_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            probe_timeout_ms: defaults::PROBE_TIMEOUT_MS,
            strict_probe_timeout_ms: defaults::STRICT_PROBE_TIMEOUT_MS,
            assume_online_fallback: true,
        }
    }
}

impl NetworkConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    pub fn strict_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.strict_probe_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,
    /// Upper bound for every single remote call
    pub timeout_ms: u64,
    pub access_token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::REMOTE_BASE_URL.to_string(),
            timeout_ms: defaults::REMOTE_TIMEOUT_MS,
            access_token: None,
        }
    }
}

impl RemoteConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    pub database_url: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: defaults::DATABASE_URL.to_string(),
        }
    }
}

impl SyncConfig {
    pub fn load(path: Option<String>) -> Result<Self> {
        let config_path = path.unwrap_or_else(default_config_path);

        let config = if Path::new(&config_path).exists() {
            let content = fs::read_to_string(&config_path)
                .context("Failed to read config file")?;
            toml::from_str(&content)
                .context("Failed to parse config file")?
        } else {
            environment::from_env()?
        };

        config.validate()?;
        debug!("{}", environment::summary(&config));
        Ok(config)
    }

    pub fn save(&self, path: Option<String>) -> Result<()> {
        let config_path = path.unwrap_or_else(default_config_path);

        let parent = Path::new(&config_path).parent()
            .context("Invalid config path")?;
        fs::create_dir_all(parent)?;

        let content = toml::to_string_pretty(self)?;
        fs::write(&config_path, content)?;

        Ok(())
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.retry.max_attempts == 0 {
            return Err(anyhow::anyhow!("retry.max_attempts must be at least 1"));
        }
        if self.network.probe_endpoints.is_empty() {
            return Err(anyhow::anyhow!("network.probe_endpoints cannot be empty"));
        }
        if self.network.probe_timeout_ms == 0 || self.network.strict_probe_timeout_ms == 0 {
            return Err(anyhow::anyhow!("probe timeouts must be greater than zero"));
        }
        if self.remote.timeout_ms == 0 {
            return Err(anyhow::anyhow!("remote.timeout_ms must be greater than zero"));
        }
        if self.storage.database_url.is_empty() {
            return Err(anyhow::anyhow!("storage.database_url cannot be empty"));
        }
        Ok(())
    }

    pub fn cooldown(&self) -> chrono::Duration {
        chrono::Duration::hours(self.sync.cooldown_hours as i64)
    }

    pub fn auto_sync_debounce(&self) -> Duration {
        Duration::from_millis(self.sync.auto_sync_debounce_ms)
    }

    pub fn network_check_interval(&self) -> Duration {
        Duration::from_secs(self.sync.network_check_interval_secs)
    }

    pub fn status_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.sync.status_refresh_interval_secs)
    }
}

fn default_config_path() -> String {
    dirs::config_dir()
        .map(|p| p.join("workout-sync/config.toml"))
        .unwrap_or_else(|| "config.toml".into())
        .to_string_lossy()
        .to_string()
}
