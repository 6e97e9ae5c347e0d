// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Environment-based configuration

use super::{NetworkConfig, RemoteConfig, RetryConfig, StorageConfig, SyncConfig, SyncPolicyConfig};
use crate::constants::defaults;
use anyhow::{Context, Result};
use std::env;
use tracing::{info, warn};

/// Load configuration from `WORKOUT_SYNC_*` environment variables
pub fn from_env() -> Result<SyncConfig> {
    info!("Loading configuration from environment variables");

    if let Err(e) = dotenv::dotenv() {
        warn!("No .env file found or failed to load: {}", e);
    }

    let config = SyncConfig {
        sync: SyncPolicyConfig {
            cooldown_hours: env_var_or("WORKOUT_SYNC_COOLDOWN_HOURS", &defaults::SYNC_COOLDOWN_HOURS.to_string())?
                .parse()
                .context("Invalid WORKOUT_SYNC_COOLDOWN_HOURS value")?,
            auto_sync_debounce_ms: env_var_or("WORKOUT_SYNC_DEBOUNCE_MS", &defaults::AUTO_SYNC_DEBOUNCE_MS.to_string())?
                .parse()
                .context("Invalid WORKOUT_SYNC_DEBOUNCE_MS value")?,
            network_check_interval_secs: env_var_or(
                "WORKOUT_SYNC_NETWORK_CHECK_SECS",
                &defaults::NETWORK_CHECK_INTERVAL_SECS.to_string(),
            )?
            .parse()
            .context("Invalid WORKOUT_SYNC_NETWORK_CHECK_SECS value")?,
            status_refresh_interval_secs: env_var_or(
                "WORKOUT_SYNC_STATUS_REFRESH_SECS",
                &defaults::STATUS_REFRESH_INTERVAL_SECS.to_string(),
            )?
            .parse()
            .context("Invalid WORKOUT_SYNC_STATUS_REFRESH_SECS value")?,
        },

        retry: RetryConfig {
            max_attempts: env_var_or("WORKOUT_SYNC_RETRY_ATTEMPTS", &defaults::RETRY_MAX_ATTEMPTS.to_string())?
                .parse()
                .context("Invalid WORKOUT_SYNC_RETRY_ATTEMPTS value")?,
            base_delay_ms: env_var_or("WORKOUT_SYNC_RETRY_DELAY_MS", &defaults::RETRY_BASE_DELAY_MS.to_string())?
                .parse()
                .context("Invalid WORKOUT_SYNC_RETRY_DELAY_MS value")?,
        },

        network: NetworkConfig {
            probe_endpoints: match env::var("WORKOUT_SYNC_PROBE_ENDPOINTS") {
                Ok(raw) => parse_endpoints(&raw),
                Err(_) => NetworkConfig::default().probe_endpoints,
            },
            probe_timeout_ms: env_var_or("WORKOUT_SYNC_PROBE_TIMEOUT_MS", &defaults::PROBE_TIMEOUT_MS.to_string())?
                .parse()
                .context("Invalid WORKOUT_SYNC_PROBE_TIMEOUT_MS value")?,
            strict_probe_timeout_ms: env_var_or(
                "WORKOUT_SYNC_STRICT_PROBE_TIMEOUT_MS",
                &defaults::STRICT_PROBE_TIMEOUT_MS.to_string(),
            )?
            .parse()
            .context("Invalid WORKOUT_SYNC_STRICT_PROBE_TIMEOUT_MS value")?,
            assume_online_fallback: env_var_or("WORKOUT_SYNC_ASSUME_ONLINE", "true")?
                .parse()
                .context("Invalid WORKOUT_SYNC_ASSUME_ONLINE value")?,
        },

        remote: RemoteConfig {
            base_url: env_var_or("WORKOUT_SYNC_REMOTE_URL", defaults::REMOTE_BASE_URL)?,
            timeout_ms: env_var_or("WORKOUT_SYNC_REMOTE_TIMEOUT_MS", &defaults::REMOTE_TIMEOUT_MS.to_string())?
                .parse()
                .context("Invalid WORKOUT_SYNC_REMOTE_TIMEOUT_MS value")?,
            access_token: env::var("WORKOUT_SYNC_ACCESS_TOKEN").ok(),
        },

        storage: StorageConfig {
            database_url: env_var_or("WORKOUT_SYNC_DATABASE_URL", defaults::DATABASE_URL)?,
        },
    };

    info!("Configuration loaded successfully");
    Ok(config)
}

/// Summary of the configuration for logging (without secrets)
pub fn summary(config: &SyncConfig) -> String {
    format!(
        "Workout Sync Configuration:\n\
         - Remote: {}\n\
         - Access Token: {}\n\
         - Database: {}\n\
         - Sync Cooldown: {}h\n\
         - Retry: {} attempts, {}ms base delay\n\
         - Probe Endpoints: {}",
        config.remote.base_url,
        if config.remote.access_token.is_some() { "Configured" } else { "None" },
        if config.storage.database_url.starts_with("sqlite:") { "SQLite" } else { "External DB" },
        config.sync.cooldown_hours,
        config.retry.max_attempts,
        config.retry.base_delay_ms,
        config.network.probe_endpoints.len()
    )
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> Result<String> {
    Ok(env::var(key).unwrap_or_else(|_| default.to_string()))
}

/// Parse comma-separated probe URLs
fn parse_endpoints(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
