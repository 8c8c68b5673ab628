//! Domain service contracts.

pub mod dispatch;

pub use dispatch::{DispatchResult, LogDispatcher, NotificationDispatcher, TransitionNotification};
