//! Notification repository and sink traits

use async_trait::async_trait;

use super::entity::Notification;
use crate::domain::error::DomainError;
use super::event::TeamEvent;
use crate::domain::team::TeamId;

#[cfg(test)]
use mockall::automock;

/// Repository for team notifications
#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Persists a new notification
    async fn create(&self, notification: Notification) -> Result<Notification, DomainError>;

    /// Lists a team's notifications, newest first
    async fn list_by_team(
        &self,
        team_id: &TeamId,
        limit: usize,
    ) -> Result<Vec<Notification>, DomainError>;

    /// Marks every unread notification of a team as read, returning how many changed
    async fn mark_all_read(&self, team_id: &TeamId) -> Result<usize, DomainError>;
}

/// Fire-and-forget delivery of team events.
///
/// `publish` never blocks and never fails from the caller's point of view.
#[cfg_attr(test, automock)]
pub trait NotificationSink: Send + Sync {
    fn publish(&self, event: TeamEvent);
}
