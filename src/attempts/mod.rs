// Failed-login tracking and timed account lockout

pub mod tracker;
pub mod types;

pub use tracker::LoginAttemptTracker;
pub use types::{LockStatus, LockoutConfig, LoginAttemptRecord};
