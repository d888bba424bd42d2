//! Task tracking for team members
//!
//! Every operation is restricted to members of the task's team. Adding a task
//! and moving one into `Completed` publish a team event; delivery is best
//! effort and never fails the write.

use std::sync::Arc;

use tracing::info;

use crate::domain::notification::{NotificationSink, TeamEvent};
use crate::domain::task::{Task, TaskChanges, TaskId, TaskRepository, TaskStatus};
use crate::domain::team::{Team, TeamRepository};
use crate::domain::user::UserId;
use crate::domain::DomainError;
use crate::infrastructure::team::require_member;

const TASK_NOT_FOUND: &str = "Task not found";
const ASSIGNEE_NOT_MEMBER: &str = "Assignee is not a member of this team";
const NOTHING_TO_UPDATE: &str = "Nothing to update";

/// Fields of a task being added
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub assigned_to: Option<String>,
}

/// Requested changes to a task, as received
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<String>,
}

/// Adds, updates and lists a team's tasks on behalf of its members
pub struct TaskService {
    tasks: Arc<dyn TaskRepository>,
    teams: Arc<dyn TeamRepository>,
    sink: Arc<dyn NotificationSink>,
    list_limit: usize,
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskService")
            .field("teams", &self.teams)
            .field("list_limit", &self.list_limit)
            .finish_non_exhaustive()
    }
}

impl TaskService {
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        teams: Arc<dyn TeamRepository>,
        sink: Arc<dyn NotificationSink>,
        list_limit: usize,
    ) -> Self {
        Self {
            tasks,
            teams,
            sink,
            list_limit,
        }
    }

    /// Add a pending task to `team_id`
    pub async fn add_task(
        &self,
        user_id: &UserId,
        team_id: &str,
        new_task: NewTask,
    ) -> Result<Task, DomainError> {
        let team = require_member(&*self.teams, team_id, user_id).await?;

        let mut task = Task::new(team.id().clone(), &new_task.title)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        if let Some(description) = new_task.description.as_deref() {
            task = task
                .with_description(description)
                .map_err(|e| DomainError::validation(e.to_string()))?;
        }

        if let Some(assignee) = new_task.assigned_to.as_deref() {
            task = task.with_assignee(assignee_in(&team, assignee)?);
        }

        let task = self.tasks.create(task).await?;

        info!(team_id = %task.team_id(), task_id = %task.id(), user_id = %user_id, "Task added");
        self.sink.publish(TeamEvent::TaskAdded {
            team_id: task.team_id().clone(),
            task_title: task.title().to_string(),
        });

        Ok(task)
    }

    /// Apply `update` to a task of one of the caller's teams
    pub async fn update_task(
        &self,
        user_id: &UserId,
        task_id: &str,
        update: TaskUpdate,
    ) -> Result<Task, DomainError> {
        let task_id = TaskId::parse(task_id).map_err(|_| DomainError::not_found(TASK_NOT_FOUND))?;

        let mut task = self
            .tasks
            .get(&task_id)
            .await?
            .ok_or_else(|| DomainError::not_found(TASK_NOT_FOUND))?;

        let team = require_member(&*self.teams, task.team_id().as_str(), user_id).await?;

        let changes = TaskChanges {
            title: update.title,
            description: update.description,
            status: update.status,
            assigned_to: update
                .assigned_to
                .as_deref()
                .map(|assignee| assignee_in(&team, assignee))
                .transpose()?,
        };

        if changes.is_empty() {
            return Err(DomainError::validation(NOTHING_TO_UPDATE));
        }

        let completed = task
            .apply(changes)
            .map_err(|e| DomainError::validation(e.to_string()))?;

        let task = self.tasks.update(task).await?;

        info!(
            team_id = %task.team_id(),
            task_id = %task.id(),
            user_id = %user_id,
            status = ?task.status(),
            "Task updated"
        );

        if completed {
            self.sink.publish(TeamEvent::TaskCompleted {
                team_id: task.team_id().clone(),
                task_title: task.title().to_string(),
            });
        }

        Ok(task)
    }

    /// Newest tasks of `team_id`, up to the configured limit
    pub async fn list_for_member(
        &self,
        team_id: &str,
        user_id: &UserId,
    ) -> Result<Vec<Task>, DomainError> {
        let team = require_member(&*self.teams, team_id, user_id).await?;
        self.tasks.list_by_team(team.id(), self.list_limit).await
    }
}

/// Tasks can only be assigned to members of their team
fn assignee_in(team: &Team, raw: &str) -> Result<UserId, DomainError> {
    UserId::new(raw.trim())
        .ok()
        .filter(|id| team.is_member(id))
        .ok_or_else(|| DomainError::validation(ASSIGNEE_NOT_MEMBER))
}
