// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Constants Module
//!
//! Storage keys, remote collection names and the default tuning values of
//! the sync engine. Deployment overrides live in [`crate::config`].

/// Logical keys of the durable local key-value store
pub mod storage_keys {
    /// Ordered list of workout records
    pub const WORKOUTS: &str = "workouts_cache";
    /// Exercise catalog (built-in plus custom)
    pub const EXERCISES: &str = "exercises_cache";
    /// Workout ids awaiting upload
    pub const PENDING_UPLOADS: &str = "pending_uploads";
    /// Custom exercises awaiting remote creation
    pub const PENDING_EXERCISE_UPLOADS: &str = "pending_exercise_uploads";
    /// Last successful (or attempted) sync, RFC 3339
    pub const LAST_SYNC_TIME: &str = "last_sync_time";
    /// In-progress workout owned by the UI
    pub const CURRENT_DRAFT_WORKOUT: &str = "current_draft_workout";
}

/// Remote document store collections
pub mod collections {
    pub const WORKOUTS: &str = "workouts";
    pub const EXERCISE_REVIEW_QUEUE: &str = "exercise_review_queue";
    pub const CONNECTIVITY: &str = "connectivity";
    pub const CONNECTIVITY_DOCUMENT: &str = "test";

    /// Per-user custom exercise collection
    pub fn user_exercises(user_id: &str) -> String {
        format!("exercises/users/{user_id}")
    }

    /// Document field holding the owner id
    pub const OWNER_FIELD: &str = "userId";
    /// Document field used for ordering pulls
    pub const CREATED_AT_FIELD: &str = "createdAt";
}

/// Default tuning values
pub mod defaults {
    /// Minimum time between two user-initiated syncs
    pub const SYNC_COOLDOWN_HOURS: u64 = 18;

    pub const RETRY_MAX_ATTEMPTS: u32 = 3;
    pub const RETRY_BASE_DELAY_MS: u64 = 1000;

    /// Per-endpoint timeout of the lenient connectivity probe
    pub const PROBE_TIMEOUT_MS: u64 = 3000;
    /// Timeout of the remote-read connectivity check gating a sync
    pub const STRICT_PROBE_TIMEOUT_MS: u64 = 5000;
    /// Upper bound for any single remote document operation
    pub const REMOTE_TIMEOUT_MS: u64 = 30_000;

    pub const AUTO_SYNC_DEBOUNCE_MS: u64 = 1000;
    pub const NETWORK_CHECK_INTERVAL_SECS: u64 = 5;
    pub const STATUS_REFRESH_INTERVAL_SECS: u64 = 30;

    pub const PROBE_ENDPOINTS: [&str; 3] = [
        "https://www.google.com/favicon.ico",
        "https://httpbin.org/status/200",
        "https://jsonplaceholder.typicode.com/posts/1",
    ];

    pub const DATABASE_URL: &str = "sqlite:./data/workouts.db";
    pub const REMOTE_BASE_URL: &str = "http://localhost:8090/v1";
}

/// Service identity used in logs and diagnostics
pub mod service {
    pub const SERVICE_NAME: &str = "workout-sync";
    pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Messages surfaced to the UI
pub mod messages {
    pub const ANONYMOUS_SYNC_DENIED: &str =
        "Anonymous users cannot sync workouts. Please create an account to enable sync.";
    pub const NO_NETWORK: &str = "No network connection available";
    pub const SYNC_NOT_ALLOWED: &str = "Sync not allowed";
    pub const UNTITLED_WORKOUT: &str = "Untitled Workout";
}
