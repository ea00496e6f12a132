// Portal flows: login, profile update and logout composed over the
// tracker, the session manager and the notifier

use crate::attempts::LoginAttemptTracker;
use crate::notify::{FieldChange, LoginEvent, NotificationOutcome, Notifier, ProfileUpdateEvent};
use crate::session::{Session, SessionManager, UserData};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Seam for credential verification
///
/// Checking the credentials themselves is the embedder's concern; the
/// portal only sequences the surrounding state transitions. `None` means
/// the credentials did not match; `Some` carries the user payload for the
/// new session.
#[async_trait]
pub trait CredentialBackend: Send + Sync {
    async fn authenticate(
        &self,
        account_id: &str,
        secret: &str,
    ) -> Result<Option<UserData>, String>;
}

/// Result of a login attempt
#[derive(Debug)]
pub enum LoginOutcome {
    LoggedIn(Session),
    /// The account is locked; retry after the remaining seconds elapse
    Locked { remaining_seconds: i64 },
    InvalidCredentials { remaining_attempts: u32 },
}

/// Result of a profile update
#[derive(Debug, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated,
    NotAuthenticated,
}

/// Composed portal flows
///
/// Notifications are dispatched as detached tasks after the primary state
/// transition commits; their failures are logged and never roll back or
/// block the login or update that triggered them.
pub struct PortalService {
    backend: Arc<dyn CredentialBackend>,
    attempts: LoginAttemptTracker,
    sessions: Arc<SessionManager>,
    notifier: Arc<Notifier>,
}

impl PortalService {
    /// Create a new portal service
    pub fn new(
        backend: Arc<dyn CredentialBackend>,
        attempts: LoginAttemptTracker,
        sessions: Arc<SessionManager>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            backend,
            attempts,
            sessions,
            notifier,
        }
    }

    /// The session manager backing this portal
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// The login-attempt tracker backing this portal
    pub fn attempts(&self) -> &LoginAttemptTracker {
        &self.attempts
    }

    /// Attempt a login
    ///
    /// A locked account short-circuits before the credentials are even
    /// checked. A successful login clears the attempt record, creates the
    /// session, and fires the login notification off the critical path.
    pub async fn login(
        &self,
        account_id: &str,
        secret: &str,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> Result<LoginOutcome, String> {
        let status = self.attempts.is_account_locked(account_id).await?;
        if status.is_locked {
            return Ok(LoginOutcome::Locked {
                remaining_seconds: status.remaining_seconds,
            });
        }

        let Some(user) = self.backend.authenticate(account_id, secret).await? else {
            self.attempts.record_failed_login(account_id).await?;

            let status = self.attempts.is_account_locked(account_id).await?;
            if status.is_locked {
                return Ok(LoginOutcome::Locked {
                    remaining_seconds: status.remaining_seconds,
                });
            }
            return Ok(LoginOutcome::InvalidCredentials {
                remaining_attempts: self.attempts.remaining_attempts(account_id).await?,
            });
        };

        self.attempts.reset_login_attempts(account_id).await?;
        let session = self.sessions.create_session(user.clone()).await?;

        match string_field(&user, "email") {
            Some(user_email) => {
                let event = LoginEvent {
                    user_email,
                    account_number: string_field(&user, "accountNumber"),
                    ip_address,
                    user_agent,
                };
                self.dispatch_login_notification(event);
            }
            None => debug!(
                "No email on record for {}, skipping login notification",
                account_id
            ),
        }

        Ok(LoginOutcome::LoggedIn(session))
    }

    /// Apply a profile update to the current session
    ///
    /// Refuses without a valid session. Fields whose value actually changed
    /// are reported in the update notification.
    pub async fn update_profile(&self, updates: UserData) -> Result<UpdateOutcome, String> {
        let Some(current) = self.sessions.current_user().await? else {
            return Ok(UpdateOutcome::NotAuthenticated);
        };

        let changes: Vec<FieldChange> = updates
            .iter()
            .filter(|(field, value)| current.get(*field) != Some(*value))
            .map(|(field, value)| FieldChange {
                field: field.clone(),
                old_value: current.get(field).map(display_value),
                new_value: Some(display_value(value)),
            })
            .collect();

        let user_email =
            string_field(&updates, "email").or_else(|| string_field(&current, "email"));
        let account_number = string_field(&updates, "accountNumber")
            .or_else(|| string_field(&current, "accountNumber"));

        self.sessions.update_session(updates).await?;

        if !changes.is_empty() {
            match user_email {
                Some(user_email) => {
                    let event = ProfileUpdateEvent {
                        user_email,
                        account_number,
                        changes,
                    };
                    self.dispatch_update_notification(event);
                }
                None => debug!("No email on record, skipping profile-update notification"),
            }
        }

        Ok(UpdateOutcome::Updated)
    }

    /// Log out, tearing down the session
    pub async fn logout(&self) -> Result<(), String> {
        self.sessions.destroy_session().await
    }

    fn dispatch_login_notification(&self, event: LoginEvent) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            match notifier.notify_login(&event).await {
                Ok(NotificationOutcome::Sent) => {}
                Ok(NotificationOutcome::RateLimited) => {
                    debug!("Login notification for {} was rate-limited", event.user_email)
                }
                Err(e) => warn!("Login notification failed: {}", e),
            }
        });
    }

    fn dispatch_update_notification(&self, event: ProfileUpdateEvent) {
        let notifier = self.notifier.clone();
        tokio::spawn(async move {
            match notifier.notify_profile_update(&event).await {
                Ok(NotificationOutcome::Sent) => {}
                Ok(NotificationOutcome::RateLimited) => debug!(
                    "Profile-update notification for {} was rate-limited",
                    event.user_email
                ),
                Err(e) => warn!("Profile-update notification failed: {}", e),
            }
        });
    }
}

/// Read a string-valued field from a user payload
fn string_field(user: &UserData, field: &str) -> Option<String> {
    user.get(field)
        .and_then(|value| value.as_str())
        .map(|s| s.to_string())
}

/// Render a payload value for the change list
fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
