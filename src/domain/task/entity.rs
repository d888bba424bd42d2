//! Task entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::storage::{StorageEntity, StorageKey};
use crate::domain::team::TeamId;
use crate::domain::user::UserId;

const MAX_TITLE_LENGTH: usize = 200;
const MAX_DESCRIPTION_LENGTH: usize = 2000;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskValidationError {
    #[error("Title required")]
    EmptyTitle,

    #[error("Task title cannot exceed {0} characters")]
    TitleTooLong(usize),

    #[error("Task description cannot exceed {0} characters")]
    DescriptionTooLong(usize),

    #[error("Invalid task id")]
    InvalidId,
}

/// Task identifier (UUID string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(String);

impl TaskId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Accept only identifiers this service could have issued
    pub fn parse(raw: &str) -> Result<Self, TaskValidationError> {
        uuid::Uuid::parse_str(raw)
            .map(|id| Self(id.to_string()))
            .map_err(|_| TaskValidationError::InvalidId)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl StorageKey for TaskId {
    fn as_str(&self) -> &str {
        &self.0
    }
}

/// Progress of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum TaskStatus {
    #[default]
    Pending,
    #[serde(rename = "In Progress")]
    InProgress,
    Completed,
}

/// Partial update of a task; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub assigned_to: Option<UserId>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// A work item owned by a team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    team_id: TeamId,
    title: String,
    #[serde(default)]
    description: String,
    assigned_to: Option<UserId>,
    status: TaskStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn clean_title(title: &str) -> Result<String, TaskValidationError> {
    let title = title.trim();

    if title.is_empty() {
        return Err(TaskValidationError::EmptyTitle);
    }

    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(TaskValidationError::TitleTooLong(MAX_TITLE_LENGTH));
    }

    Ok(title.to_string())
}

fn clean_description(description: &str) -> Result<String, TaskValidationError> {
    let description = description.trim();

    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(TaskValidationError::DescriptionTooLong(MAX_DESCRIPTION_LENGTH));
    }

    Ok(description.to_string())
}

impl Task {
    /// Create a pending, unassigned task
    pub fn new(team_id: TeamId, title: &str) -> Result<Self, TaskValidationError> {
        let now = Utc::now();

        Ok(Self {
            id: TaskId::generate(),
            team_id,
            title: clean_title(title)?,
            description: String::new(),
            assigned_to: None,
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_description(mut self, description: &str) -> Result<Self, TaskValidationError> {
        self.description = clean_description(description)?;
        Ok(self)
    }

    pub fn with_assignee(mut self, user_id: UserId) -> Self {
        self.assigned_to = Some(user_id);
        self
    }

    // Getters

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn team_id(&self) -> &TeamId {
        &self.team_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn assigned_to(&self) -> Option<&UserId> {
        self.assigned_to.as_ref()
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Apply `changes` all at once or not at all.
    ///
    /// Returns true when this update moved the task into `Completed`.
    pub fn apply(&mut self, changes: TaskChanges) -> Result<bool, TaskValidationError> {
        let title = changes.title.as_deref().map(clean_title).transpose()?;
        let description = changes
            .description
            .as_deref()
            .map(clean_description)
            .transpose()?;

        let was_completed = self.status == TaskStatus::Completed;

        if let Some(title) = title {
            self.title = title;
        }
        if let Some(description) = description {
            self.description = description;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
        if let Some(assignee) = changes.assigned_to {
            self.assigned_to = Some(assignee);
        }
        self.updated_at = Utc::now();

        Ok(!was_completed && self.status == TaskStatus::Completed)
    }
}

impl StorageEntity for Task {
    type Key = TaskId;

    fn key(&self) -> &Self::Key {
        &self.id
    }

    fn scope(&self) -> &str {
        self.team_id.as_str()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
