//! Notification repository over generic storage

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use crate::domain::notification::{Notification, NotificationRepository};
use crate::domain::storage::Storage;
use crate::domain::team::TeamId;
use crate::domain::DomainError;

/// Notification repository backed by any `Storage<Notification>`, scoped by team
#[derive(Debug)]
pub struct StorageNotificationRepository {
    storage: Arc<dyn Storage<Notification>>,
}

impl StorageNotificationRepository {
    pub fn new(storage: Arc<dyn Storage<Notification>>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl NotificationRepository for StorageNotificationRepository {
    async fn create(&self, notification: Notification) -> Result<Notification, DomainError> {
        self.storage.create(notification).await
    }

    async fn list_by_team(
        &self,
        team_id: &TeamId,
        limit: usize,
    ) -> Result<Vec<Notification>, DomainError> {
        self.storage.list_scope(team_id.as_str(), limit).await
    }

    async fn mark_all_read(&self, team_id: &TeamId) -> Result<usize, DomainError> {
        self.storage
            .patch_scope(team_id.as_str(), &json!({ "read": true }))
            .await
    }
}
