// Storage abstraction for client-local persistence
// Two instances back the portal: a session-lifetime-scoped slot for the
// session record and a durable store for login-attempt records.

pub mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

/// Key-value storage seam for persisted records
///
/// Implementations are expected to be local and cheap; callers perform the
/// whole read-modify-persist cycle as one synchronous step, so no locking
/// discipline is required beyond what the backend itself needs.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Get the raw value stored under `key`, if any
    async fn get(&self, key: &str) -> Result<Option<String>, String>;

    /// Store `value` under `key`, overwriting any previous value
    async fn set(&self, key: &str, value: &str) -> Result<(), String>;

    /// Remove the value stored under `key`; removing a missing key is not an error
    async fn remove(&self, key: &str) -> Result<(), String>;
}
