//! Notification reads for team members

use std::sync::Arc;

use tracing::info;

use crate::domain::notification::{Notification, NotificationRepository};
use crate::domain::team::{TeamId, TeamRepository};
use crate::domain::user::UserId;
use crate::domain::DomainError;
use crate::infrastructure::team::require_member;

/// Lists and acknowledges a team's notifications on behalf of its members
pub struct NotificationService {
    repository: Arc<dyn NotificationRepository>,
    teams: Arc<dyn TeamRepository>,
    list_limit: usize,
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService")
            .field("teams", &self.teams)
            .field("list_limit", &self.list_limit)
            .finish_non_exhaustive()
    }
}

impl NotificationService {
    pub fn new(
        repository: Arc<dyn NotificationRepository>,
        teams: Arc<dyn TeamRepository>,
        list_limit: usize,
    ) -> Self {
        Self {
            repository,
            teams,
            list_limit,
        }
    }

    /// Newest notifications of `team_id`, up to the configured limit
    pub async fn list_for_member(
        &self,
        team_id: &str,
        user_id: &UserId,
    ) -> Result<Vec<Notification>, DomainError> {
        let team_id = self.ensure_member(team_id, user_id).await?;
        self.repository.list_by_team(&team_id, self.list_limit).await
    }

    /// Mark every notification of `team_id` read, returning how many changed
    pub async fn mark_all_read_for_member(
        &self,
        team_id: &str,
        user_id: &UserId,
    ) -> Result<usize, DomainError> {
        let team_id = self.ensure_member(team_id, user_id).await?;
        let updated = self.repository.mark_all_read(&team_id).await?;

        info!(team_id = %team_id, user_id = %user_id, updated, "Notifications marked read");
        Ok(updated)
    }

    async fn ensure_member(&self, team_id: &str, user_id: &UserId) -> Result<TeamId, DomainError> {
        let team = require_member(&*self.teams, team_id, user_id).await?;
        Ok(team.id().clone())
    }
}
