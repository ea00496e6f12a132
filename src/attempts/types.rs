// Login-attempt record and lockout types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lockout configuration
#[derive(Debug, Clone)]
pub struct LockoutConfig {
    /// Failed attempts allowed before the account is locked
    pub max_attempts: u32,
    /// How long a lockout lasts, in milliseconds
    pub lockout_duration_ms: i64,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_duration_ms: 300_000, // 5 minutes
        }
    }
}

/// Per-account failed-login record
///
/// `locked_until` is only ever set once `count` has reached the configured
/// maximum; an expired lockout resets the whole record on the next read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginAttemptRecord {
    /// Number of consecutive failed attempts
    pub count: u32,
    /// When the most recent failure was recorded
    pub last_attempt: Option<DateTime<Utc>>,
    /// When the lockout ends, if one is active
    pub locked_until: Option<DateTime<Utc>>,
}

/// Lockout state reported to callers, with the remaining time for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockStatus {
    pub is_locked: bool,
    /// Whole seconds until the lockout ends, rounded up; 0 when unlocked
    pub remaining_seconds: i64,
}

impl LockStatus {
    pub fn unlocked() -> Self {
        Self {
            is_locked: false,
            remaining_seconds: 0,
        }
    }
}
