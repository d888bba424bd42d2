//! Task repository over generic storage

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::storage::Storage;
use crate::domain::task::{Task, TaskId, TaskRepository};
use crate::domain::team::TeamId;
use crate::domain::DomainError;

/// Task repository backed by any `Storage<Task>`, scoped by team
#[derive(Debug)]
pub struct StorageTaskRepository {
    storage: Arc<dyn Storage<Task>>,
}

impl StorageTaskRepository {
    pub fn new(storage: Arc<dyn Storage<Task>>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl TaskRepository for StorageTaskRepository {
    async fn create(&self, task: Task) -> Result<Task, DomainError> {
        self.storage.create(task).await
    }

    async fn get(&self, id: &TaskId) -> Result<Option<Task>, DomainError> {
        self.storage.get(id).await
    }

    async fn update(&self, task: Task) -> Result<Task, DomainError> {
        self.storage.update(task).await
    }

    async fn list_by_team(
        &self,
        team_id: &TeamId,
        limit: usize,
    ) -> Result<Vec<Task>, DomainError> {
        self.storage.list_scope(team_id.as_str(), limit).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::task::{TaskChanges, TaskStatus};
    use crate::infrastructure::storage::InMemoryStorage;

    #[tokio::test]
    async fn test_tasks_round_through_storage() {
        let repo = StorageTaskRepository::new(Arc::new(InMemoryStorage::<Task>::new()));
        let team_id = TeamId::new("team-1").unwrap();

        let first = repo
            .create(Task::new(team_id.clone(), "Design").unwrap())
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let mut second = repo
            .create(Task::new(team_id.clone(), "Build").unwrap())
            .await
            .unwrap();
        repo.create(Task::new(TeamId::new("team-2").unwrap(), "Other").unwrap())
            .await
            .unwrap();

        second
            .apply(TaskChanges {
                status: Some(TaskStatus::InProgress),
                ..Default::default()
            })
            .unwrap();
        repo.update(second.clone()).await.unwrap();

        let stored = repo.get(second.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), TaskStatus::InProgress);

        let listed = repo.list_by_team(&team_id, 50).await.unwrap();
        let titles: Vec<_> = listed.iter().map(|t| t.title()).collect();
        assert_eq!(titles, vec!["Build", "Design"]);
        assert_eq!(listed[1].id(), first.id());
    }
}
