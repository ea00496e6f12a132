// Notification dispatch: configuration check, throttle gate, send

use super::throttle::{NotificationThrottle, ThrottleConfig};
use super::types::{LoginEvent, NotificationKind, ProfileUpdateEvent};
use crate::config::EmailConfig;
use crate::time::Clock;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Seam for the outbound email provider
#[async_trait]
pub trait NotificationSender: Send + Sync {
    async fn send(
        &self,
        kind: NotificationKind,
        params: HashMap<String, String>,
    ) -> Result<(), String>;
}

/// Sender that records every send in memory, for tests and dry runs
pub struct MemorySender {
    sent: RwLock<Vec<(NotificationKind, HashMap<String, String>)>>,
    fail: AtomicBool,
}

impl MemorySender {
    pub fn new() -> Self {
        Self {
            sent: RwLock::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    /// Make every subsequent send fail, to exercise failure paths
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Everything sent so far
    pub async fn sent(&self) -> Vec<(NotificationKind, HashMap<String, String>)> {
        self.sent.read().await.clone()
    }
}

impl Default for MemorySender {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationSender for MemorySender {
    async fn send(
        &self,
        kind: NotificationKind,
        params: HashMap<String, String>,
    ) -> Result<(), String> {
        if self.fail.load(Ordering::SeqCst) {
            return Err("Simulated provider failure".to_string());
        }

        self.sent.write().await.push((kind, params));
        Ok(())
    }
}

/// Result of a notification attempt that did not hard-fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationOutcome {
    Sent,
    /// The per-user budget was exhausted; nothing was sent
    RateLimited,
}

/// Notification service around the throttle and the provider seam
///
/// Validates configuration before consuming any quota, gates every send
/// through the shared per-user throttle, and treats a rate-limited send as
/// a normal outcome rather than an error. Notifications are delivered to
/// the configured admin address; the acting user's email rides in the
/// payload and keys the throttle. A send failure after the quota was
/// consumed does not reclaim the unit.
pub struct Notifier {
    throttle: NotificationThrottle,
    sender: Arc<dyn NotificationSender>,
    clock: Arc<dyn Clock>,
    email: EmailConfig,
}

impl Notifier {
    /// Create a new notifier
    pub fn new(
        sender: Arc<dyn NotificationSender>,
        clock: Arc<dyn Clock>,
        throttle_config: ThrottleConfig,
        email: EmailConfig,
    ) -> Self {
        Self {
            throttle: NotificationThrottle::new(clock.clone(), throttle_config),
            sender,
            clock,
            email,
        }
    }

    /// Send a login notification, subject to the per-user throttle
    pub async fn notify_login(&self, event: &LoginEvent) -> Result<NotificationOutcome, String> {
        let recipient = self.check_configuration()?;

        if self.throttle.is_rate_limited(&event.user_email).await {
            return Ok(NotificationOutcome::RateLimited);
        }

        let mut params = event.template_params(self.clock.now());
        params.insert("to_email".to_string(), recipient.to_string());
        self.sender.send(NotificationKind::Login, params).await?;

        info!("Login notification sent to {}", event.user_email);

        Ok(NotificationOutcome::Sent)
    }

    /// Send a profile-update notification, subject to the per-user throttle
    pub async fn notify_profile_update(
        &self,
        event: &ProfileUpdateEvent,
    ) -> Result<NotificationOutcome, String> {
        let recipient = self.check_configuration()?;

        if self.throttle.is_rate_limited(&event.user_email).await {
            return Ok(NotificationOutcome::RateLimited);
        }

        let mut params = event.template_params(self.clock.now());
        params.insert("to_email".to_string(), recipient.to_string());
        self.sender
            .send(NotificationKind::ProfileUpdate, params)
            .await?;

        info!(
            "Profile-update notification sent to {} ({} changes)",
            event.user_email,
            event.changes.len()
        );

        Ok(NotificationOutcome::Sent)
    }

    /// Reject the notification path when the provider is not configured
    ///
    /// Runs before the throttle check so a misconfigured provider never
    /// consumes quota. Yields the admin address notifications are
    /// delivered to.
    fn check_configuration(&self) -> Result<&str, String> {
        self.email.validate().map_err(|errors| {
            debug!("Notification provider not configured: {}", errors.join(", "));
            format!(
                "Notification provider is not configured: {}",
                errors.join(", ")
            )
        })?;

        self.email.admin_email.as_deref().ok_or_else(|| {
            "Notification provider is not configured: admin email is missing".to_string()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;
    use chrono::Utc;

    fn email_config() -> EmailConfig {
        EmailConfig {
            service_id: Some("service-1".to_string()),
            login_template_id: Some("tmpl-login".to_string()),
            update_template_id: Some("tmpl-update".to_string()),
            public_key: Some("pk".to_string()),
            admin_email: Some("admin@bank.example".to_string()),
        }
    }

    fn login_event() -> LoginEvent {
        LoginEvent {
            user_email: "user@bank.example".to_string(),
            account_number: Some("1234567".to_string()),
            ip_address: Some("203.0.113.7".to_string()),
            user_agent: None,
        }
    }

    #[tokio::test]
    async fn test_send_goes_through_when_configured() {
        let sender = Arc::new(MemorySender::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let notifier = Notifier::new(
            sender.clone(),
            clock,
            ThrottleConfig::default(),
            email_config(),
        );

        let outcome = notifier.notify_login(&login_event()).await.unwrap();

        assert_eq!(outcome, NotificationOutcome::Sent);
        let sent = sender.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, NotificationKind::Login);
        assert_eq!(sent[0].1.get("to_email").unwrap(), "admin@bank.example");
        assert_eq!(sent[0].1.get("user_email").unwrap(), "user@bank.example");
    }

    #[tokio::test]
    async fn test_missing_configuration_rejects_without_consuming_quota() {
        let sender = Arc::new(MemorySender::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let notifier = Notifier::new(
            sender.clone(),
            clock,
            ThrottleConfig {
                limit: 1,
                window_ms: 3_600_000,
            },
            EmailConfig::default(),
        );

        assert!(notifier.notify_login(&login_event()).await.is_err());
        assert!(sender.sent().await.is_empty());

        // The rejected attempt consumed nothing: with a limit of one, a
        // properly configured notifier would still get one send through.
        let configured = Notifier::new(
            sender.clone(),
            Arc::new(ManualClock::new(Utc::now())),
            ThrottleConfig {
                limit: 1,
                window_ms: 3_600_000,
            },
            email_config(),
        );
        assert_eq!(
            configured.notify_login(&login_event()).await.unwrap(),
            NotificationOutcome::Sent
        );
    }

    #[tokio::test]
    async fn test_rate_limited_send_is_an_outcome_not_an_error() {
        let sender = Arc::new(MemorySender::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let notifier = Notifier::new(
            sender.clone(),
            clock,
            ThrottleConfig {
                limit: 1,
                window_ms: 3_600_000,
            },
            email_config(),
        );

        assert_eq!(
            notifier.notify_login(&login_event()).await.unwrap(),
            NotificationOutcome::Sent
        );
        assert_eq!(
            notifier.notify_login(&login_event()).await.unwrap(),
            NotificationOutcome::RateLimited
        );
        assert_eq!(sender.sent().await.len(), 1);
    }

    #[tokio::test]
    async fn test_both_kinds_share_one_budget() {
        let sender = Arc::new(MemorySender::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let notifier = Notifier::new(
            sender,
            clock,
            ThrottleConfig {
                limit: 1,
                window_ms: 3_600_000,
            },
            email_config(),
        );

        let update = ProfileUpdateEvent {
            user_email: "user@bank.example".to_string(),
            account_number: Some("1234567".to_string()),
            changes: Vec::new(),
        };

        assert_eq!(
            notifier.notify_login(&login_event()).await.unwrap(),
            NotificationOutcome::Sent
        );
        assert_eq!(
            notifier.notify_profile_update(&update).await.unwrap(),
            NotificationOutcome::RateLimited
        );
    }

    #[tokio::test]
    async fn test_send_failure_still_consumes_the_quota_unit() {
        let sender = Arc::new(MemorySender::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let notifier = Notifier::new(
            sender.clone(),
            clock,
            ThrottleConfig {
                limit: 1,
                window_ms: 3_600_000,
            },
            email_config(),
        );

        sender.fail_sends(true);
        assert!(notifier.notify_login(&login_event()).await.is_err());

        sender.fail_sends(false);
        assert_eq!(
            notifier.notify_login(&login_event()).await.unwrap(),
            NotificationOutcome::RateLimited
        );
    }
}
