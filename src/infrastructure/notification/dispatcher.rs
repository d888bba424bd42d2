//! Background task persisting team events as notifications

use std::sync::Arc;

use tokio::sync::mpsc::Receiver;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::domain::notification::TeamEvent;
use crate::domain::notification::NotificationRepository;

/// Drains the sink channel into the notification repository
pub struct NotificationDispatcher {
    receiver: Receiver<TeamEvent>,
    repository: Arc<dyn NotificationRepository>,
}

impl std::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationDispatcher").finish_non_exhaustive()
    }
}

impl NotificationDispatcher {
    pub fn new(
        receiver: Receiver<TeamEvent>,
        repository: Arc<dyn NotificationRepository>,
    ) -> Self {
        Self {
            receiver,
            repository,
        }
    }

    /// Run on a dedicated task until every sink is dropped
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(mut self) {
        info!("Notification dispatcher started");

        while let Some(event) = self.receiver.recv().await {
            let notification = event.to_notification();

            match self.repository.create(notification).await {
                Ok(saved) => {
                    debug!(
                        team_id = %saved.team_id(),
                        notification_id = %saved.id(),
                        event = event.kind(),
                        "Notification stored"
                    );
                }
                Err(e) => {
                    error!(
                        team_id = %event.team_id(),
                        event = event.kind(),
                        error = %e,
                        "Failed to store notification"
                    );
                }
            }
        }

        info!("Notification dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::{MockNotificationRepository, NotificationSink};
    use crate::domain::team::TeamId;
    use crate::domain::user::UserId;
    use crate::domain::DomainError;
    use crate::infrastructure::notification::ChannelNotificationSink;

    #[tokio::test]
    async fn test_dispatcher_stores_each_event() {
        let mut repository = MockNotificationRepository::new();
        repository
            .expect_create()
            .times(2)
            .returning(|notification| Ok(notification));

        let (sink, receiver) = ChannelNotificationSink::new(8);
        let handle = NotificationDispatcher::new(receiver, Arc::new(repository)).spawn();

        let team_id = TeamId::new("team-1").unwrap();
        sink.publish(TeamEvent::TeamCreated {
            team_id: team_id.clone(),
            team_name: "Rocket".to_string(),
            actor_email: "a@x.io".to_string(),
        });
        sink.publish(TeamEvent::MemberJoined {
            team_id,
            user_id: UserId::new("bob").unwrap(),
            actor_email: "b@x.io".to_string(),
        });

        drop(sink);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_dispatcher_survives_repository_errors() {
        let mut repository = MockNotificationRepository::new();
        let mut calls = 0;
        repository.expect_create().times(2).returning(move |notification| {
            calls += 1;
            if calls == 1 {
                Err(DomainError::storage("disk full"))
            } else {
                Ok(notification)
            }
        });

        let (sink, receiver) = ChannelNotificationSink::new(8);
        let handle = NotificationDispatcher::new(receiver, Arc::new(repository)).spawn();

        for _ in 0..2 {
            sink.publish(TeamEvent::TeamCreated {
                team_id: TeamId::new("team-1").unwrap(),
                team_name: "Rocket".to_string(),
                actor_email: "a@x.io".to_string(),
            });
        }

        drop(sink);
        handle.await.unwrap();
    }
}
