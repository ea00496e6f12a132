// Rolling-window throttle for outbound notification sends

use crate::time::Clock;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Throttle configuration
#[derive(Debug, Clone)]
pub struct ThrottleConfig {
    /// Sends permitted per user within one window
    pub limit: usize,
    /// Width of the trailing window, in milliseconds
    pub window_ms: i64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            limit: 5,
            window_ms: 3_600_000, // 1 hour
        }
    }
}

/// Per-user rolling-window counter gating notification sends
///
/// The send log lives in process memory only; a restart resets every
/// user's budget. Both notification kinds draw from the same per-user
/// budget.
pub struct NotificationThrottle {
    clock: Arc<dyn Clock>,
    config: ThrottleConfig,
    sends: RwLock<HashMap<String, Vec<DateTime<Utc>>>>,
}

impl NotificationThrottle {
    /// Create a new throttle
    pub fn new(clock: Arc<dyn Clock>, config: ThrottleConfig) -> Self {
        Self {
            clock,
            config,
            sends: RwLock::new(HashMap::new()),
        }
    }

    /// Check whether a send for `user_id` is rate-limited
    ///
    /// A permitted check reserves one quota unit immediately, so callers
    /// must check exactly once per actual send attempt. The unit stays
    /// consumed even if the send later fails.
    pub async fn is_rate_limited(&self, user_id: &str) -> bool {
        let now = self.clock.now();
        let window = Duration::milliseconds(self.config.window_ms);

        let mut sends = self.sends.write().await;
        let recent = sends.entry(user_id.to_string()).or_default();
        recent.retain(|sent_at| now - *sent_at < window);

        if recent.len() >= self.config.limit {
            warn!(
                "Notification rate limit reached for {} ({} sends in window)",
                user_id,
                recent.len()
            );
            return true;
        }

        recent.push(now);
        false
    }
}
