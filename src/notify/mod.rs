// Outbound notification gating and dispatch

pub mod service;
pub mod throttle;
pub mod types;

pub use service::{MemorySender, NotificationOutcome, NotificationSender, Notifier};
pub use throttle::{NotificationThrottle, ThrottleConfig};
pub use types::{FieldChange, LoginEvent, NotificationKind, ProfileUpdateEvent};
