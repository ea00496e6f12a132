// Notification event types and template-parameter assembly

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// The two notification kinds the portal sends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Login,
    ProfileUpdate,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Login => "login",
            NotificationKind::ProfileUpdate => "profile_update",
        }
    }
}

/// A successful login, as reported in the notification email
#[derive(Debug, Clone)]
pub struct LoginEvent {
    pub user_email: String,
    pub account_number: Option<String>,
    /// Caller-supplied; IP retrieval is outside this core
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl LoginEvent {
    /// Assemble the template parameters for the login notification
    ///
    /// The recipient address is filled in by the notifier.
    pub fn template_params(&self, now: DateTime<Utc>) -> HashMap<String, String> {
        let mut params = HashMap::new();
        params.insert("user_email".to_string(), self.user_email.clone());
        params.insert("subject".to_string(), "New login detected".to_string());
        params.insert(
            "account_number".to_string(),
            self.account_number.clone().unwrap_or_else(unknown),
        );
        params.insert("login_time".to_string(), format_timestamp(now));
        params.insert(
            "ip_address".to_string(),
            self.ip_address.clone().unwrap_or_else(unknown),
        );
        params.insert(
            "user_agent".to_string(),
            self.user_agent.clone().unwrap_or_else(unknown),
        );
        params
    }
}

/// A profile update, with the list of changed fields
#[derive(Debug, Clone)]
pub struct ProfileUpdateEvent {
    pub user_email: String,
    pub account_number: Option<String>,
    pub changes: Vec<FieldChange>,
}

impl ProfileUpdateEvent {
    /// Assemble the template parameters for the profile-update notification
    ///
    /// The recipient address is filled in by the notifier.
    pub fn template_params(&self, now: DateTime<Utc>) -> HashMap<String, String> {
        let changes = self
            .changes
            .iter()
            .map(FieldChange::describe)
            .collect::<Vec<_>>()
            .join("; ");

        let mut params = HashMap::new();
        params.insert("user_email".to_string(), self.user_email.clone());
        params.insert(
            "subject".to_string(),
            "Profile update notification".to_string(),
        );
        params.insert(
            "account_number".to_string(),
            self.account_number.clone().unwrap_or_else(unknown),
        );
        params.insert("update_time".to_string(), format_timestamp(now));
        params.insert("changes".to_string(), changes);
        params.insert("change_count".to_string(), self.changes.len().to_string());
        params
    }
}

/// One changed profile field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

impl FieldChange {
    /// One-line description of the change for the notification body
    pub fn describe(&self) -> String {
        format!(
            "{}: '{}' to '{}'",
            self.field,
            self.old_value.as_deref().unwrap_or("(empty)"),
            self.new_value.as_deref().unwrap_or("(empty)")
        )
    }
}

fn format_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn unknown() -> String {
    "unknown".to_string()
}
