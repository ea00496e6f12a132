// Session types and token generation

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Arbitrary user payload carried by the session (account number, display
/// name, email, ...)
pub type UserData = HashMap<String, serde_json::Value>;

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session timeout in milliseconds; bounds both the absolute lifetime
    /// (set at creation) and the allowed inactivity gap
    pub timeout_ms: i64,
    /// Interval between inactivity-watchdog checks, in milliseconds
    pub watchdog_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 1_800_000,       // 30 minutes
            watchdog_interval_ms: 60_000, // check once per minute
        }
    }
}

/// Authenticated session record
///
/// Exactly one session exists per client at a time; the record lives in a
/// single storage slot and is overwritten whole on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque high-entropy token, 32 random bytes hex-encoded
    pub token: String,
    /// User payload captured at login and merged on profile updates
    pub user: UserData,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    /// Absolute expiry (creation + timeout)
    pub expires_at: DateTime<Utc>,
    /// Last observed activity, refreshed on every read
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// Create a new session starting at `now`
    ///
    /// Fails only when the OS random source is unavailable; a session must
    /// never be created with weak randomness.
    pub fn new(user: UserData, now: DateTime<Utc>, timeout_ms: i64) -> Result<Self, String> {
        Ok(Self {
            token: generate_token()?,
            user,
            created_at: now,
            expires_at: now + Duration::milliseconds(timeout_ms),
            last_activity: now,
        })
    }

    /// Whether the session is past its absolute expiry
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Refresh the last-activity timestamp
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_activity = now;
    }
}

/// Generate a fresh session token: 32 bytes from the OS random source,
/// hex-encoded to 64 characters
fn generate_token() -> Result<String, String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| format!("Secure random source unavailable: {}", e))?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user_data() -> UserData {
        let mut user = UserData::new();
        user.insert(
            "accountNumber".to_string(),
            serde_json::Value::String("1234567".to_string()),
        );
        user
    }

    #[test]
    fn test_token_is_64_hex_chars() {
        let token = generate_token().unwrap();

        assert_eq!(token.len(), 64);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(generate_token().unwrap(), generate_token().unwrap());
    }

    #[test]
    fn test_session_expiry_window() {
        let now = Utc::now();
        let session = Session::new(user_data(), now, 1_800_000).unwrap();

        assert_eq!(session.created_at, now);
        assert_eq!(session.expires_at - now, Duration::milliseconds(1_800_000));
        assert!(!session.is_expired(now));
        assert!(!session.is_expired(now + Duration::milliseconds(1_799_999)));
        assert!(session.is_expired(now + Duration::milliseconds(1_800_001)));
    }

    #[test]
    fn test_touch_moves_last_activity_only() {
        let now = Utc::now();
        let mut session = Session::new(user_data(), now, 1_800_000).unwrap();

        let later = now + Duration::milliseconds(42_000);
        session.touch(later);

        assert_eq!(session.last_activity, later);
        assert_eq!(session.expires_at, now + Duration::milliseconds(1_800_000));
    }
}
