// Session manager: the single session slot, its expiry rules and the
// inactivity watchdog

use super::types::{Session, SessionConfig, UserData};
use crate::storage::KeyValueStore;
use crate::time::Clock;
use chrono::Duration;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

/// Storage key of the single session slot
const SESSION_KEY: &str = "bank_session";

/// Forced-navigation seam, invoked when the watchdog tears down an idle
/// session
pub trait Navigator: Send + Sync {
    fn redirect_to_login(&self);
}

/// Navigator that goes nowhere, for embedders that handle navigation
/// elsewhere
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNavigator;

impl Navigator for NoopNavigator {
    fn redirect_to_login(&self) {}
}

/// Session manager for handling the session lifecycle
///
/// Owns the one persisted session slot, the expiry and activity rules, and
/// the inactivity watchdog. At most one watchdog task runs at a time; the
/// handle is owned here so independent manager instances never interfere.
pub struct SessionManager {
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    navigator: Arc<dyn Navigator>,
    config: SessionConfig,
    watchdog: Mutex<Option<JoinHandle<()>>>,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(
        storage: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        navigator: Arc<dyn Navigator>,
        config: SessionConfig,
    ) -> Self {
        Self {
            storage,
            clock,
            navigator,
            config,
            watchdog: Mutex::new(None),
        }
    }

    /// Create a session for the given user payload
    ///
    /// Overwrites any existing session in the slot and restarts the
    /// inactivity watchdog. Fails if the OS random source or the storage
    /// backend is unavailable.
    pub async fn create_session(&self, user: UserData) -> Result<Session, String> {
        let now = self.clock.now();
        let session = Session::new(user, now, self.config.timeout_ms)?;

        self.persist(&session).await?;
        self.start_watchdog();

        info!("Session created, expires at {}", session.expires_at);

        Ok(session)
    }

    /// Get the current session, if one exists and has not expired
    ///
    /// Corrupt persisted data is purged and treated as absent. An expired
    /// session is destroyed on detection. A successful read refreshes the
    /// session's last-activity timestamp.
    pub async fn get_session(&self) -> Result<Option<Session>, String> {
        let Some(mut session) = self.load().await? else {
            return Ok(None);
        };

        let now = self.clock.now();
        if session.is_expired(now) {
            info!("Session expired at {}, destroying", session.expires_at);
            self.destroy_session().await?;
            return Ok(None);
        }

        session.touch(now);
        self.persist(&session).await?;

        Ok(Some(session))
    }

    /// Merge the given fields into the current session's user payload
    ///
    /// Silently does nothing when no valid session exists. Fields not named
    /// in `updates` are preserved.
    pub async fn update_session(&self, updates: UserData) -> Result<(), String> {
        let Some(mut session) = self.get_session().await? else {
            return Ok(());
        };

        for (key, value) in updates {
            session.user.insert(key, value);
        }
        session.touch(self.clock.now());
        self.persist(&session).await?;

        debug!("Session user payload updated");

        Ok(())
    }

    /// Destroy the current session and stop the watchdog
    ///
    /// Idempotent; destroying an absent session is not an error.
    pub async fn destroy_session(&self) -> Result<(), String> {
        self.storage.remove(SESSION_KEY).await?;
        self.stop_watchdog();

        debug!("Session destroyed");

        Ok(())
    }

    /// Whether a valid session currently exists
    pub async fn is_authenticated(&self) -> Result<bool, String> {
        Ok(self.get_session().await?.is_some())
    }

    /// User payload of the current session, if any
    pub async fn current_user(&self) -> Result<Option<UserData>, String> {
        Ok(self.get_session().await?.map(|session| session.user))
    }

    /// Refresh the session's last-activity timestamp
    ///
    /// Low-latency path for user-interaction signals (pointer movement, key
    /// presses, clicks, scrolling); does not wait for the watchdog tick.
    /// Both paths write "now", so last writer wins safely.
    pub async fn record_activity(&self) -> Result<(), String> {
        let Some(mut session) = self.load().await? else {
            return Ok(());
        };

        session.touch(self.clock.now());
        self.persist(&session).await
    }

    /// Whether the inactivity watchdog task is currently running
    pub fn watchdog_running(&self) -> bool {
        self.watchdog
            .lock()
            .expect("watchdog lock poisoned")
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Read the raw persisted session without touching its activity
    async fn load(&self) -> Result<Option<Session>, String> {
        let Some(raw) = self.storage.get(SESSION_KEY).await? else {
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                debug!("Purging unparsable session record: {}", e);
                self.storage.remove(SESSION_KEY).await?;
                Ok(None)
            }
        }
    }

    async fn persist(&self, session: &Session) -> Result<(), String> {
        let raw = serde_json::to_string(session)
            .map_err(|e| format!("Failed to serialize session: {}", e))?;
        self.storage.set(SESSION_KEY, &raw).await
    }

    /// Start the inactivity watchdog, stopping any previous one first
    ///
    /// The watchdog re-reads the raw record on every tick without touching
    /// its activity timestamp, so the inactivity comparison stays
    /// meaningful. It polices inactivity only; absolute expiry is enforced
    /// on the read path. It stops itself once the slot is empty.
    fn start_watchdog(&self) {
        self.stop_watchdog();

        let storage = self.storage.clone();
        let clock = self.clock.clone();
        let navigator = self.navigator.clone();
        let timeout_ms = self.config.timeout_ms;
        let interval_ms = self.config.watchdog_interval_ms;

        let handle = tokio::spawn(async move {
            let mut ticker = interval(tokio::time::Duration::from_millis(interval_ms));
            // The first tick fires immediately; skip it so a fresh session
            // is not inspected in the same instant it was created.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let raw = match storage.get(SESSION_KEY).await {
                    Ok(Some(raw)) => raw,
                    Ok(None) => {
                        debug!("Watchdog found no session, stopping");
                        break;
                    }
                    Err(e) => {
                        warn!("Watchdog could not read session: {}", e);
                        continue;
                    }
                };

                let session: Session = match serde_json::from_str(&raw) {
                    Ok(session) => session,
                    Err(e) => {
                        debug!("Watchdog purging unparsable session record: {}", e);
                        let _ = storage.remove(SESSION_KEY).await;
                        break;
                    }
                };

                let idle = clock.now() - session.last_activity;
                if idle > Duration::milliseconds(timeout_ms) {
                    info!(
                        "Session idle for {}s, destroying and redirecting to login",
                        idle.num_seconds()
                    );
                    let _ = storage.remove(SESSION_KEY).await;
                    navigator.redirect_to_login();
                    break;
                }
            }
        });

        let mut watchdog = self.watchdog.lock().expect("watchdog lock poisoned");
        *watchdog = Some(handle);
    }

    fn stop_watchdog(&self) {
        let mut watchdog = self.watchdog.lock().expect("watchdog lock poisoned");
        if let Some(handle) = watchdog.take() {
            handle.abort();
        }
    }
}

impl Drop for SessionManager {
    fn drop(&mut self) {
        self.stop_watchdog();
    }
}
