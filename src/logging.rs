// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Logging configuration with structured output

use crate::config::SyncConfig;
use crate::constants::service;
use anyhow::Result;
use std::env;
use std::io;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Include source file and line numbers
    pub include_location: bool,
    /// Include thread information
    pub include_thread: bool,
    /// Emit span open/close events (one span per sync cycle)
    pub include_spans: bool,
    pub service_name: String,
    pub service_version: String,
    /// Environment (development, staging, production)
    pub environment: String,
}

#[derive(Debug, Clone)]
pub enum LogFormat {
    /// JSON lines for log shipping
    Json,
    /// Human-readable, for development
    Pretty,
    /// Single-line, for device logs
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            include_location: false,
            include_thread: false,
            include_spans: false,
            service_name: service::SERVICE_NAME.to_string(),
            service_version: service::SERVICE_VERSION.to_string(),
            environment: "development".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    pub fn from_env() -> Self {
        let level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let format = match env::var("LOG_FORMAT").as_deref() {
            Ok("json") => LogFormat::Json,
            Ok("compact") => LogFormat::Compact,
            _ => LogFormat::Pretty,
        };

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());
        let is_production = environment == "production";

        Self {
            level,
            format,
            include_location: is_production || env::var("LOG_INCLUDE_LOCATION").is_ok(),
            include_thread: is_production || env::var("LOG_INCLUDE_THREAD").is_ok(),
            include_spans: is_production || env::var("LOG_INCLUDE_SPANS").is_ok(),
            service_name: env::var("SERVICE_NAME").unwrap_or_else(|_| service::SERVICE_NAME.to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| service::SERVICE_VERSION.to_string()),
            environment,
        }
    }

    fn span_events(&self) -> FmtSpan {
        if self.include_spans {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }

    /// Install the global subscriber and log the engine settings once
    pub fn init(&self, sync: &SyncConfig) -> Result<()> {
        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let registry = tracing_subscriber::registry().with(env_filter);
        let compact = matches!(self.format, LogFormat::Compact);
        let layer = fmt::layer()
            .with_file(self.include_location && !compact)
            .with_line_number(self.include_location && !compact)
            .with_thread_ids(self.include_thread && !compact)
            .with_thread_names(self.include_thread && !compact)
            .with_target(!compact)
            .with_writer(io::stdout)
            .with_span_events(if compact { FmtSpan::NONE } else { self.span_events() });

        match self.format {
            LogFormat::Json => registry.with(layer.json()).try_init()?,
            LogFormat::Pretty => registry.with(layer).try_init()?,
            LogFormat::Compact => registry.with(layer.compact()).try_init()?,
        }

        self.log_startup_info(sync);
        Ok(())
    }

    fn log_startup_info(&self, sync: &SyncConfig) {
        info!(
            service.name = %self.service_name,
            service.version = %self.service_version,
            environment = %self.environment,
            log.format = ?self.format,
            sync.cooldown_hours = sync.sync.cooldown_hours,
            sync.retry_attempts = sync.retry.max_attempts,
            sync.remote = %sync.remote.base_url,
            "Workout sync engine starting"
        );
    }
}

/// Initialize logging from environment variables
pub fn init_from_env(sync: &SyncConfig) -> Result<()> {
    LoggingConfig::from_env().init(sync)
}

/// Canonical sync events
pub struct SyncLogger;

impl SyncLogger {
    /// End of a sync cycle that got past the permission gate
    pub fn log_sync_outcome(user_id: &str, synced_count: usize, error_count: usize, duration_ms: u64) {
        if error_count == 0 {
            info!(
                user.id = %user_id,
                sync.synced_count = synced_count,
                sync.error_count = error_count,
                sync.duration_ms = duration_ms,
                "Sync completed"
            );
        } else {
            warn!(
                user.id = %user_id,
                sync.synced_count = synced_count,
                sync.error_count = error_count,
                sync.duration_ms = duration_ms,
                "Sync completed with errors"
            );
        }
    }

    /// Result of pushing one workout, after retries
    pub fn log_push_outcome(workout_id: &str, attempts: u32, success: bool, error: Option<&str>) {
        if success {
            info!(workout.id = %workout_id, push.attempts = attempts, "Workout pushed");
        } else {
            warn!(
                workout.id = %workout_id,
                push.attempts = attempts,
                push.error = error.unwrap_or(""),
                "Push failed, queued for later"
            );
        }
    }

    /// Guest or rate-limited sync attempt
    pub fn log_permission_refusal(user_id: &str, reason: &str) {
        info!(user.id = %user_id, sync.refusal = %reason, "Sync refused");
    }

    pub fn log_connectivity_transition(was_online: bool, is_online: bool) {
        info!(
            network.was_online = was_online,
            network.is_online = is_online,
            "Connectivity changed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[test]
    fn test_logging_config_from_env() {
        env::set_var("RUST_LOG", "debug");
        env::set_var("LOG_FORMAT", "json");
        env::set_var("ENVIRONMENT", "production");
        env::set_var("SERVICE_NAME", "test-service");

        let config = LoggingConfig::from_env();

        assert_eq!(config.level, "debug");
        assert!(matches!(config.format, LogFormat::Json));
        assert_eq!(config.environment, "production");
        assert_eq!(config.service_name, "test-service");
        assert!(config.include_location);

        env::remove_var("RUST_LOG");
        env::remove_var("LOG_FORMAT");
        env::remove_var("ENVIRONMENT");
        env::remove_var("SERVICE_NAME");
    }

    #[test]
    fn test_subscriber_installs_once() {
        let config = LoggingConfig {
            format: LogFormat::Compact,
            ..LoggingConfig::default()
        };
        let sync = SyncConfig::default();

        assert!(config.init(&sync).is_ok());
        assert!(config.init(&sync).is_err());
    }

    #[test]
    fn test_default_logging_config() {
        let config = LoggingConfig::default();

        assert_eq!(config.level, "info");
        assert!(matches!(config.format, LogFormat::Pretty));
        assert_eq!(config.environment, "development");
        assert_eq!(config.service_name, "workout-sync");
        assert!(!config.include_location);
    }
}
