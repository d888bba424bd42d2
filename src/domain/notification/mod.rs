//! Notification domain
//!
//! Team activity feed fed by membership and task events.

mod entity;
mod event;
mod repository;

pub use entity::{Notification, NotificationCategory, NotificationId};
pub use event::TeamEvent;
pub use repository::{NotificationRepository, NotificationSink};

#[cfg(test)]
pub use repository::{MockNotificationRepository, MockNotificationSink};
