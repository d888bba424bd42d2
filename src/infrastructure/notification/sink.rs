//! Channel-backed notification sink

use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tracing::warn;

use crate::domain::notification::TeamEvent;
use crate::domain::notification::NotificationSink;
use crate::infrastructure::observability::record_notification_dropped;

/// Pushes events into a bounded channel without waiting.
///
/// A full or closed channel drops the event and logs a warning.
#[derive(Debug, Clone)]
pub struct ChannelNotificationSink {
    sender: Sender<TeamEvent>,
}

impl ChannelNotificationSink {
    /// Create a sink and the receiving half for a dispatcher
    pub fn new(capacity: usize) -> (Self, Receiver<TeamEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (Self { sender }, receiver)
    }
}

impl NotificationSink for ChannelNotificationSink {
    fn publish(&self, event: TeamEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                warn!(
                    team_id = %event.team_id(),
                    event = event.kind(),
                    "Notification channel full, dropping event"
                );
                record_notification_dropped("full");
            }
            Err(TrySendError::Closed(event)) => {
                warn!(
                    team_id = %event.team_id(),
                    event = event.kind(),
                    "Notification channel closed, dropping event"
                );
                record_notification_dropped("closed");
            }
        }
    }
}
