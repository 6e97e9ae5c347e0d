// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Error taxonomy for the synchronization engine
//!
//! Local reads never fail for "not found" (they return `None` or an empty
//! collection). Everything that talks to the remote store returns a
//! [`SyncError`] and leaves it to the caller to turn the failure into ledger
//! state or a user-visible error string.

use std::time::Duration;

/// Result alias used across the crate
pub type SyncResult<T> = std::result::Result<T, SyncError>;

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A record is missing fields the remote store requires
    #[error("Invalid workout data: missing required fields ({0})")]
    InvalidData(String),

    /// Connection refused, DNS failure, TLS failure and friends
    #[error("Network error: {0}")]
    Network(String),

    /// A remote call did not complete within its deadline
    #[error("Remote operation timed out after {0:?}")]
    Timeout(Duration),

    /// The remote store answered with a non-success status
    #[error("Remote store rejected request ({status}): {message}")]
    Remote { status: u16, message: String },

    /// The durable local key-value store failed
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Workout not found: {0}")]
    NotFound(String),

    /// Guest identity or rate limit
    #[error("Sync not permitted: {0}")]
    Permission(String),
}

impl SyncError {
    /// Whether retrying the same call later could succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) => true,
            Self::Remote { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Validation failures must never be retried blindly
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidData(_))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Network(format!("request timed out: {err}"));
        }
        match err.status() {
            Some(status) => Self::Remote {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => Self::Network(err.to_string()),
        }
    }
}

impl From<sqlx::Error> for SyncError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(err.to_string())
    }
}
