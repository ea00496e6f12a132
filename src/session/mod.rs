// Session lifecycle: creation, expiry checking, activity tracking, teardown

pub mod manager;
pub mod types;

pub use manager::{Navigator, NoopNavigator, SessionManager};
pub use types::{Session, SessionConfig, UserData};
