// Configuration loading from the environment
// Every numeric knob falls back to its default when unset or non-numeric;
// a bad value never prevents the portal core from starting.

use crate::attempts::LockoutConfig;
use crate::notify::ThrottleConfig;
use crate::session::SessionConfig;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use tracing::warn;

/// Load a `.env` file if one is present
///
/// Convenience for embedders; missing files are ignored.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

/// Complete runtime configuration for the portal core
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub session: SessionConfig,
    pub lockout: LockoutConfig,
    pub throttle: ThrottleConfig,
    pub email: EmailConfig,
}

impl AuthConfig {
    /// Build the configuration from environment variables
    pub fn from_env() -> Self {
        let session = SessionConfig {
            timeout_ms: env_number("SESSION_TIMEOUT_MS", SessionConfig::default().timeout_ms),
            watchdog_interval_ms: env_number(
                "WATCHDOG_INTERVAL_MS",
                SessionConfig::default().watchdog_interval_ms,
            ),
        };

        let lockout = LockoutConfig {
            max_attempts: env_number("MAX_LOGIN_ATTEMPTS", LockoutConfig::default().max_attempts),
            lockout_duration_ms: env_number(
                "LOCKOUT_DURATION_MS",
                LockoutConfig::default().lockout_duration_ms,
            ),
        };

        let throttle = ThrottleConfig {
            limit: env_number("NOTIFICATION_RATE_LIMIT", ThrottleConfig::default().limit),
            window_ms: env_number(
                "NOTIFICATION_WINDOW_MS",
                ThrottleConfig::default().window_ms,
            ),
        };

        Self {
            session,
            lockout,
            throttle,
            email: EmailConfig::from_env(),
        }
    }
}

/// Email notification provider settings
///
/// Every field is optional at load time; `validate` reports which ones are
/// missing before the notification path is allowed to run.
#[derive(Debug, Clone, Default)]
pub struct EmailConfig {
    pub service_id: Option<String>,
    pub login_template_id: Option<String>,
    pub update_template_id: Option<String>,
    pub public_key: Option<String>,
    pub admin_email: Option<String>,
}

impl EmailConfig {
    /// Build the email configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            service_id: env::var("EMAIL_SERVICE_ID").ok(),
            login_template_id: env::var("EMAIL_TEMPLATE_ID_LOGIN").ok(),
            update_template_id: env::var("EMAIL_TEMPLATE_ID_UPDATE").ok(),
            public_key: env::var("EMAIL_PUBLIC_KEY").ok(),
            admin_email: env::var("ADMIN_EMAIL").ok(),
        }
    }

    /// Check that every provider setting is present
    ///
    /// Returns the full list of missing fields so the embedder can surface
    /// them all at once.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.service_id.is_none() {
            errors.push("service id is missing".to_string());
        }
        if self.login_template_id.is_none() {
            errors.push("login template id is missing".to_string());
        }
        if self.update_template_id.is_none() {
            errors.push("update template id is missing".to_string());
        }
        if self.public_key.is_none() {
            errors.push("public key is missing".to_string());
        }
        if self.admin_email.is_none() {
            errors.push("admin email is missing".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Read a numeric environment variable, falling back to `default` when the
/// variable is unset or does not parse
fn env_number<T>(name: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
{
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!(
                    "Ignoring non-numeric value '{}' for {}, using default {}",
                    raw, name, default
                );
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_environment() {
        let config = AuthConfig::default();

        assert_eq!(config.session.timeout_ms, 1_800_000);
        assert_eq!(config.lockout.max_attempts, 5);
        assert_eq!(config.lockout.lockout_duration_ms, 300_000);
        assert_eq!(config.throttle.limit, 5);
        assert_eq!(config.throttle.window_ms, 3_600_000);
    }

    #[test]
    fn test_env_number_override() {
        env::set_var("TEST_PORTAL_TIMEOUT_OVERRIDE", "60000");
        assert_eq!(env_number("TEST_PORTAL_TIMEOUT_OVERRIDE", 1_800_000i64), 60_000);
        env::remove_var("TEST_PORTAL_TIMEOUT_OVERRIDE");
    }

    #[test]
    fn test_env_number_falls_back_on_garbage() {
        env::set_var("TEST_PORTAL_TIMEOUT_GARBAGE", "not-a-number");
        assert_eq!(env_number("TEST_PORTAL_TIMEOUT_GARBAGE", 1_800_000i64), 1_800_000);
        env::remove_var("TEST_PORTAL_TIMEOUT_GARBAGE");
    }

    #[test]
    fn test_email_config_validation_lists_all_missing_fields() {
        let config = EmailConfig::default();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 5);

        let config = EmailConfig {
            service_id: Some("service-1".to_string()),
            login_template_id: Some("tmpl-login".to_string()),
            update_template_id: Some("tmpl-update".to_string()),
            public_key: Some("pk".to_string()),
            admin_email: Some("admin@bank.example".to_string()),
        };

        assert!(config.validate().is_ok());
    }
}
