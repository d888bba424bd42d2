//! Task repository trait

use async_trait::async_trait;

use super::entity::{Task, TaskId};
use crate::domain::team::TeamId;
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Repository for team tasks
#[cfg_attr(test, automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: Task) -> Result<Task, DomainError>;

    async fn get(&self, id: &TaskId) -> Result<Option<Task>, DomainError>;

    /// Replace an existing task
    async fn update(&self, task: Task) -> Result<Task, DomainError>;

    /// A team's tasks, newest first
    async fn list_by_team(&self, team_id: &TeamId, limit: usize)
        -> Result<Vec<Task>, DomainError>;
}
