// Tracker turning repeated login failures into a timed lockout

use super::types::{LockStatus, LockoutConfig, LoginAttemptRecord};
use crate::storage::KeyValueStore;
use crate::time::Clock;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, warn};

/// Storage key prefix for per-account attempt records
const ATTEMPT_KEY_PREFIX: &str = "login_attempts:";

/// Tracks failed logins per account and escalates to a timed lockout
///
/// Records live in the durable store so a lockout survives a page reload.
/// Expired lockouts are reset lazily on the next read rather than by a
/// background sweeper.
pub struct LoginAttemptTracker {
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    config: LockoutConfig,
}

impl LoginAttemptTracker {
    /// Create a new tracker
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        config: LockoutConfig,
    ) -> Self {
        Self {
            storage,
            clock,
            config,
        }
    }

    /// Get the attempt record for an account
    ///
    /// An expired lockout or an unparsable record resets to the zeroed
    /// default, purging the stored entry as a side effect.
    pub async fn get_login_attempts(
        &self,
        account_id: &str,
    ) -> Result<LoginAttemptRecord, String> {
        let key = attempt_key(account_id);

        let Some(raw) = self.storage.get(&key).await? else {
            return Ok(LoginAttemptRecord::default());
        };

        let record: LoginAttemptRecord = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                debug!("Purging unparsable attempt record for {}: {}", account_id, e);
                self.storage.remove(&key).await?;
                return Ok(LoginAttemptRecord::default());
            }
        };

        if let Some(locked_until) = record.locked_until {
            if self.clock.now() > locked_until {
                debug!("Lockout for {} expired, resetting attempts", account_id);
                self.storage.remove(&key).await?;
                return Ok(LoginAttemptRecord::default());
            }
        }

        Ok(record)
    }

    /// Record one failed login for an account
    ///
    /// The attempt that reaches the configured maximum is the one that
    /// triggers the lockout. Returns the updated record.
    pub async fn record_failed_login(
        &self,
        account_id: &str,
    ) -> Result<LoginAttemptRecord, String> {
        let mut record = self.get_login_attempts(account_id).await?;
        let now = self.clock.now();

        record.count += 1;
        record.last_attempt = Some(now);

        if record.count >= self.config.max_attempts {
            record.locked_until =
                Some(now + Duration::milliseconds(self.config.lockout_duration_ms));
            warn!(
                "Account {} locked after {} failed login attempts",
                account_id, record.count
            );
        }

        let raw = serde_json::to_string(&record)
            .map_err(|e| format!("Failed to serialize attempt record: {}", e))?;
        self.storage.set(&attempt_key(account_id), &raw).await?;

        Ok(record)
    }

    /// Clear the attempt record for an account
    ///
    /// Callers invoke this on successful authentication.
    pub async fn reset_login_attempts(&self, account_id: &str) -> Result<(), String> {
        self.storage.remove(&attempt_key(account_id)).await
    }

    /// Whether the account is currently locked out, with the remaining
    /// seconds for display
    pub async fn is_account_locked(&self, account_id: &str) -> Result<LockStatus, String> {
        let record = self.get_login_attempts(account_id).await?;

        let Some(locked_until) = record.locked_until else {
            return Ok(LockStatus::unlocked());
        };

        let now = self.clock.now();
        if now < locked_until {
            let remaining_ms = (locked_until - now).num_milliseconds();
            Ok(LockStatus {
                is_locked: true,
                remaining_seconds: (remaining_ms + 999) / 1000,
            })
        } else {
            Ok(LockStatus::unlocked())
        }
    }

    /// Failed attempts the account has left before it is locked
    pub async fn remaining_attempts(&self, account_id: &str) -> Result<u32, String> {
        let record = self.get_login_attempts(account_id).await?;
        Ok(self.config.max_attempts.saturating_sub(record.count))
    }
}

fn attempt_key(account_id: &str) -> String {
    format!("{}{}", ATTEMPT_KEY_PREFIX, account_id)
}
